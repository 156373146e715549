use woothee::parser::Parser;

/// Extract the client operating system from a User-Agent header value.
pub fn client_os(user_agent: Option<&str>) -> String {
    let Some(ua) = user_agent else {
        return "Unknown".to_string();
    };

    Parser::new()
        .parse(ua)
        .map(|result| result.os)
        .filter(|os| !os.is_empty() && *os != "UNKNOWN")
        .map(|os| os.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
