use ipnet::IpNet;

/// Result of parsing one raw list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedList {
    pub subnets: Vec<IpNet>,
    /// Tokens that were not valid CIDR notation.
    pub dropped: usize,
}

/// Splits `raw` on whitespace and parses every token as a CIDR block.
///
/// Malformed tokens are counted and skipped. Host bits are cleared, so
/// `10.0.0.7/24` yields `10.0.0.0/24`. Order is kept and duplicates are
/// not removed.
pub fn parse_cidrs(raw: &[u8]) -> ParsedList {
    let text = String::from_utf8_lossy(raw);
    let mut parsed = ParsedList::default();

    for token in text.split_whitespace() {
        match token.parse::<IpNet>() {
            Ok(net) => parsed.subnets.push(net.trunc()),
            Err(_) => parsed.dropped += 1,
        }
    }

    parsed
}
