//! Glob-style key matching with the same syntax as Redis `MATCH` patterns:
//! `*`, `?`, `[abc]`, `[a-z]`, `[^a]` and `\` escapes.

/// Whether `text` matches `pattern`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    // Position of the last `*` and the text index it is currently absorbing up to.
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
            continue;
        }

        if pi < p.len() {
            if let Some(next) = match_token(&p, pi, t[ti]) {
                pi = next;
                ti += 1;
                continue;
            }
        }

        match star {
            Some((sp, st)) => {
                pi = sp + 1;
                ti = st + 1;
                star = Some((sp, st + 1));
            }
            None => return false,
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

/// Match one non-`*` token at `pi` against `c`, returning the next pattern index.
fn match_token(p: &[char], pi: usize, c: char) -> Option<usize> {
    match p[pi] {
        '?' => Some(pi + 1),
        '\\' if pi + 1 < p.len() => (p[pi + 1] == c).then_some(pi + 2),
        '[' => match_class(p, pi, c),
        literal => (literal == c).then_some(pi + 1),
    }
}

fn match_class(p: &[char], start: usize, c: char) -> Option<usize> {
    let mut i = start + 1;
    let negate = i < p.len() && p[i] == '^';
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < p.len() && p[i] != ']' {
        if p[i] == '\\' && i + 1 < p.len() {
            matched |= p[i + 1] == c;
            i += 2;
        } else if i + 2 < p.len() && p[i + 1] == '-' && p[i + 2] != ']' {
            let (lo, hi) = if p[i] <= p[i + 2] {
                (p[i], p[i + 2])
            } else {
                (p[i + 2], p[i])
            };
            matched |= lo <= c && c <= hi;
            i += 3;
        } else {
            matched |= p[i] == c;
            i += 1;
        }
    }

    // Unterminated class: the bracket is a literal.
    if i >= p.len() {
        return (c == '[').then_some(start + 1);
    }

    (matched != negate).then_some(i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_star() {
        assert!(glob_match("cache*", "cache:User:1"));
        assert!(glob_match("cache*", "cache"));
        assert!(glob_match("cache*", "cachet"));
        assert!(!glob_match("cache*", "other:cache"));
    }

    #[test]
    fn test_question_and_literal() {
        assert!(glob_match("k?", "k1"));
        assert!(!glob_match("k?", "k"));
        assert!(!glob_match("k?", "k12"));
        assert!(glob_match("abc", "abc"));
        assert!(!glob_match("abc", "abd"));
    }

    #[test]
    fn test_inner_stars_backtrack() {
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(glob_match("a*b*c", "abbbc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
        assert!(glob_match("*", ""));
        assert!(glob_match("**", "anything"));
    }

    #[test]
    fn test_classes() {
        assert!(glob_match("k[12]", "k1"));
        assert!(!glob_match("k[12]", "k3"));
        assert!(glob_match("k[a-c]", "kb"));
        assert!(glob_match("k[c-a]", "kb"));
        assert!(glob_match("k[^a]", "kb"));
        assert!(!glob_match("k[^a]", "ka"));
        assert!(glob_match("k[", "k["));
    }

    #[test]
    fn test_escapes() {
        assert!(glob_match("a\\*", "a*"));
        assert!(!glob_match("a\\*", "ab"));
        assert!(glob_match("[\\]]", "]"));
    }
}
