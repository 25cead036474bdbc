//! Operator command parsing
//!
//! Keywords and investor indexes are parsed here; quantity operands are
//! passed through verbatim so the orchestrator applies its own input
//! validation before anything reaches the ledger.

/// Parsed operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Burn tokens held by the burn wallet
    Burn { amount: String },
    /// Buy tokens for an investor
    Buy { investor: usize, value: String },
    /// Redeem an investor's tokens
    Sell { investor: usize, tokens: String },
    /// Show one investor's balances
    Investor { index: usize },
    /// Re-read the fund snapshot
    Refresh,
    /// Show command usage
    Help,
    /// Leave the console
    Quit,
}

/// Parse one input line
pub fn parse(input: &str) -> Result<Command, String> {
    let mut parts = input.split_whitespace();
    let keyword = match parts.next() {
        Some(word) => word.to_lowercase(),
        None => return Err("empty command, try 'help'".to_string()),
    };
    let args: Vec<&str> = parts.collect();

    match keyword.as_str() {
        "burn" => match args.as_slice() {
            [amount] => Ok(Command::Burn {
                amount: (*amount).to_string(),
            }),
            _ => Err("usage: burn <amount>".to_string()),
        },
        "buy" => match args.as_slice() {
            [investor, value] => Ok(Command::Buy {
                investor: parse_index(investor)?,
                value: (*value).to_string(),
            }),
            _ => Err("usage: buy <investor> <value>".to_string()),
        },
        "sell" => match args.as_slice() {
            [investor, tokens] => Ok(Command::Sell {
                investor: parse_index(investor)?,
                tokens: (*tokens).to_string(),
            }),
            _ => Err("usage: sell <investor> <tokens>".to_string()),
        },
        "investor" => match args.as_slice() {
            [index] => Ok(Command::Investor {
                index: parse_index(index)?,
            }),
            _ => Err("usage: investor <index>".to_string()),
        },
        "refresh" => match args.as_slice() {
            [] => Ok(Command::Refresh),
            _ => Err("usage: refresh".to_string()),
        },
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command '{}', try 'help'", other)),
    }
}

fn parse_index(raw: &str) -> Result<usize, String> {
    raw.parse()
        .map_err(|_| format!("'{}' is not an investor index", raw))
}
