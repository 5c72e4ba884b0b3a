use proc_macro::{Delimiter, TokenStream, TokenTree};

/// Splits a `TokenStream` into comma-separated arguments.
///
/// Each argument is returned as a `Vec<TokenTree>`.
/// Commas at the top level are used as separators.
pub(crate) fn split_args(input: TokenStream) -> Vec<Vec<TokenTree>> {
    let mut args = Vec::new();
    let mut current = Vec::new();

    for token in input {
        match &token {
            TokenTree::Punct(p) if p.as_char() == ',' => {
                if !current.is_empty() {
                    args.push(current);
                    current = Vec::new();
                }
            }
            _ => current.push(token),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Converts a slice of tokens into a Rust source string.
///
/// Consecutive identifiers are separated by a space so that `impl Trait`
/// does not collapse into `implTrait`.
pub(crate) fn tokens_to_string(tokens: &[TokenTree]) -> String {
    let mut out = String::new();
    let mut prev_was_ident = false;

    for t in tokens {
        let s = t.to_string();

        let needs_space = prev_was_ident && matches!(t, TokenTree::Ident(_));

        if needs_space {
            out.push(' ');
        }

        out.push_str(&s);
        prev_was_ident = matches!(t, TokenTree::Ident(_));
    }

    out
}

/// Returns `true` if the tokens at position `i` form a `->` arrow.
pub(crate) fn is_return_arrow(tokens: &[TokenTree], i: usize) -> bool {
    if i + 1 >= tokens.len() {
        return false;
    }

    matches!(
        (&tokens[i], &tokens[i + 1]),
        (TokenTree::Punct(p1), TokenTree::Punct(p2))
            if p1.as_char() == '-' && p2.as_char() == '>'
    )
}

/// Position of the first identifier equal to `word`.
pub(crate) fn find_ident(tokens: &[TokenTree], word: &str) -> Option<usize> {
    tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == word))
}

/// Position of the parameter list of a function whose `fn` keyword is at
/// `fn_pos`.
///
/// Skips over the generic parameters, which may themselves hold parenthesized
/// groups such as `F: Fn(u8) -> u8`.
pub(crate) fn find_params(tokens: &[TokenTree], fn_pos: usize) -> Option<usize> {
    let mut depth = 0usize;

    for i in fn_pos + 2..tokens.len() {
        match &tokens[i] {
            TokenTree::Punct(p) if p.as_char() == '<' => depth += 1,
            TokenTree::Punct(p) if p.as_char() == '>' && !is_return_arrow(tokens, i - 1) => {
                depth = depth.saturating_sub(1);
            }
            TokenTree::Group(g) if depth == 0 && g.delimiter() == Delimiter::Parenthesis => {
                return Some(i);
            }
            _ => {}
        }
    }

    None
}

/// Position of the function body, the last brace-delimited group.
pub(crate) fn find_body(tokens: &[TokenTree]) -> Option<usize> {
    tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
}

/// Extracts `value` from a `key = "value"` attribute argument.
///
/// Returns `None` when the argument has another key or is not a string
/// literal.
pub(crate) fn string_arg(arg: &[TokenTree], key: &str) -> Option<String> {
    match arg {
        [TokenTree::Ident(k), TokenTree::Punct(eq), TokenTree::Literal(lit)]
            if k.to_string() == key && eq.as_char() == '=' =>
        {
            let raw = lit.to_string();
            raw.strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .map(str::to_owned)
        }
        _ => None,
    }
}

/// Builds a `compile_error!` invocation carrying `msg`.
pub(crate) fn compile_error(msg: &str) -> TokenStream {
    format!("compile_error!({msg:?});")
        .parse()
        .unwrap_or_default()
}
