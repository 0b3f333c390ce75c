/// Token stream for the XPath subset used by locator synthesis and
/// user-supplied queries
#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Name(String),
    Str(String),
    Num(f64),
    Slash,
    DSlash,
    Dot,
    DDot,
    At,
    Star,
    LBrack,
    RBrack,
    LParen,
    RParen,
    Comma,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    DColon,
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Name characters cover Android class strings ("android.widget.Button",
/// inner classes with '$') and hyphenated attribute names ("resource-id")
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '$')
}

/// Tokenize an XPath expression. Operates on bytes; expression syntax is
/// ASCII, and non-ASCII text only occurs inside quoted strings where it is
/// sliced verbatim.
pub fn tokenize(input: &str) -> Result<Vec<Tok>, String> {
    let bytes = input.as_bytes();
    let mut toks: Vec<Tok> = Vec::with_capacity(16);
    let mut i = 0;

    let char_at = |pos: usize| -> Option<char> { bytes.get(pos).map(|&b| b as char) };

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        match c {
            '/' if char_at(i + 1) == Some('/') => {
                toks.push(Tok::DSlash);
                i += 2;
            }
            '/' => {
                toks.push(Tok::Slash);
                i += 1;
            }
            '.' if char_at(i + 1) == Some('.') => {
                toks.push(Tok::DDot);
                i += 2;
            }
            '.' => {
                toks.push(Tok::Dot);
                i += 1;
            }
            '@' => {
                toks.push(Tok::At);
                i += 1;
            }
            '*' => {
                toks.push(Tok::Star);
                i += 1;
            }
            '[' => {
                toks.push(Tok::LBrack);
                i += 1;
            }
            ']' => {
                toks.push(Tok::RBrack);
                i += 1;
            }
            '(' => {
                toks.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                toks.push(Tok::RParen);
                i += 1;
            }
            ',' => {
                toks.push(Tok::Comma);
                i += 1;
            }
            '=' => {
                toks.push(Tok::Eq);
                i += 1;
            }
            '!' if char_at(i + 1) == Some('=') => {
                toks.push(Tok::Ne);
                i += 2;
            }
            '<' if char_at(i + 1) == Some('=') => {
                toks.push(Tok::Le);
                i += 2;
            }
            '<' => {
                toks.push(Tok::Lt);
                i += 1;
            }
            '>' if char_at(i + 1) == Some('=') => {
                toks.push(Tok::Ge);
                i += 2;
            }
            '>' => {
                toks.push(Tok::Gt);
                i += 1;
            }
            q @ ('\'' | '"') => {
                i += 1;
                let start = i;
                while i < bytes.len() && bytes[i] as char != q {
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err("unterminated string literal".to_string());
                }
                toks.push(Tok::Str(input[start..i].to_string()));
                i += 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < bytes.len() && matches!(bytes[i] as char, '0'..='9' | '.') {
                    i += 1;
                }
                let text = &input[start..i];
                toks.push(Tok::Num(
                    text.parse().map_err(|_| format!("bad number: {text}"))?,
                ));
            }
            c if is_name_start(c) => {
                let start = i;
                while i < bytes.len() && is_name_char(bytes[i] as char) {
                    i += 1;
                }
                if char_at(i) == Some(':') && char_at(i + 1) == Some(':') {
                    // axis::
                    toks.push(Tok::Name(input[start..i].to_string()));
                    toks.push(Tok::DColon);
                    i += 2;
                } else {
                    let name = &input[start..i];
                    // "and"/"or" are operators only after something that
                    // produced a value
                    let after_value = toks.last().is_some_and(|t| {
                        matches!(
                            t,
                            Tok::RBrack
                                | Tok::RParen
                                | Tok::Str(_)
                                | Tok::Num(_)
                                | Tok::Name(_)
                                | Tok::Star
                                | Tok::Dot
                                | Tok::DDot
                        )
                    });
                    match name {
                        "and" if after_value => toks.push(Tok::And),
                        "or" if after_value => toks.push(Tok::Or),
                        _ => toks.push(Tok::Name(name.to_string())),
                    }
                }
            }
            c => return Err(format!("unexpected character '{c}' in XPath")),
        }
    }
    Ok(toks)
}
