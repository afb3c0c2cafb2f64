use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickerError {
    #[error("Vui lòng nhập mã cổ phiếu.")]
    Empty,

    #[error("Mã cổ phiếu không hợp lệ. Vui lòng nhập mã 3-4 kí tự (VD: FPT).")]
    Invalid(String),
}

/// Trims surrounding whitespace and upper-cases the symbol
pub fn normalize_ticker(input: &str) -> String {
    input.trim().to_uppercase()
}

/// Vietnamese tickers are 3 or 4 ASCII letters/digits (FPT, VCB, E1VF...)
pub fn is_valid_vn_ticker(ticker: &str) -> bool {
    (3..=4).contains(&ticker.len()) && ticker.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Normalizes user input and checks it is a well-formed ticker
pub fn validate_ticker(input: &str) -> Result<String, TickerError> {
    let ticker = normalize_ticker(input);
    if ticker.is_empty() {
        return Err(TickerError::Empty);
    }
    if !is_valid_vn_ticker(&ticker) {
        return Err(TickerError::Invalid(ticker));
    }
    Ok(ticker)
}
