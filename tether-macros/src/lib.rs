mod utils;

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Turns an `async fn` into a plain function that starts it as a task.
///
/// ```rust,ignore
/// #[tether::task]
/// async fn answer() -> i32 {
///     42
/// }
///
/// let task: tether::Task<i32> = answer();
/// ```
///
/// The generated function spawns the body eagerly and returns the handle.
/// The task is named after the function unless `name = "..."` is given.
#[proc_macro_attribute]
pub fn task(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let Some(async_pos) = utils::find_ident(&tokens, "async") else {
        return utils::compile_error("#[tether::task] expects an `async fn`");
    };
    tokens.remove(async_pos);

    let Some(fn_pos) = utils::find_ident(&tokens, "fn") else {
        return utils::compile_error("#[tether::task] expects an `async fn`");
    };

    let mut name = match tokens.get(fn_pos + 1) {
        Some(TokenTree::Ident(id)) => id.to_string(),
        _ => return utils::compile_error("#[tether::task] could not find the function name"),
    };

    for arg in utils::split_args(attr) {
        match utils::string_arg(&arg, "name") {
            Some(custom) => name = custom,
            None => {
                return utils::compile_error("#[tether::task] only accepts `name = \"...\"`");
            }
        }
    }

    let Some(body_pos) = utils::find_body(&tokens) else {
        return TokenStream::new();
    };

    let body = match &tokens[body_pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    let Some(params) = utils::find_params(&tokens, fn_pos) else {
        return utils::compile_error("#[tether::task] could not find the parameter list");
    };

    let where_pos = (params..body_pos)
        .find(|&i| matches!(&tokens[i], TokenTree::Ident(id) if id.to_string() == "where"))
        .unwrap_or(body_pos);

    let output = if utils::is_return_arrow(&tokens, params + 1) {
        utils::tokens_to_string(&tokens[params + 3..where_pos])
    } else {
        String::from("()")
    };

    let new_signature = format!("-> ::tether::Task<{output}>");
    let new_block = format!(
        "{{
            ::tether::task::Builder::new()
                .name({name:?})
                .spawn(async move {{ {body} }})
        }}"
    );

    let (Ok(signature), Ok(block)) = (
        new_signature.parse::<TokenStream>(),
        new_block.parse::<TokenStream>(),
    ) else {
        return utils::compile_error("#[tether::task] could not rewrite the function");
    };

    let mut result: Vec<TokenTree> = tokens[..=params].to_vec();
    result.extend(signature);
    result.extend_from_slice(&tokens[where_pos..body_pos]);
    result.push(TokenTree::Group(Group::new(Delimiter::Brace, block)));

    result.into_iter().collect()
}

/// Runs an `async fn` test body as a task.
///
/// The body is spawned on the test thread. Since nothing else will publish
/// on its behalf, a body that is still suspended once `spawn` returns fails
/// the test.
#[proc_macro_attribute]
pub fn test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut tokens = item.into_iter().collect::<Vec<_>>();

    if let Some(pos) = utils::find_ident(&tokens, "async") {
        tokens.remove(pos);
    }

    let Some(pos) = utils::find_body(&tokens) else {
        return TokenStream::new();
    };

    let block = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    let new_block = format!(
        "{{
        let task = ::tether::spawn(async move {{ {} }});
        assert!(
            task.is_ready(),
            \"test body is still suspended after spawn returned\"
        );
    }}",
        block
    );

    let Ok(block) = new_block.parse::<TokenStream>() else {
        return utils::compile_error("#[tether::test] could not rewrite the function");
    };

    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, block));

    let test_attr: TokenStream = "#[test]".parse().unwrap_or_default();
    let mut result: Vec<TokenTree> = test_attr.into_iter().collect();
    result.extend(tokens);

    result.into_iter().collect()
}
