//! Metadata tokens.
//!
//! A token is a 32-bit handle addressing one row of one metadata table: the high byte is the
//! table identifier, the low 24 bits the 1-based row. Row `0` is the null reference, whatever
//! the table byte says. Tokens are only meaningful relative to the module that owns the table.

use std::fmt;

use crate::metadata::tables::TableId;

/// A metadata token, `table << 24 | row`.
///
/// # Examples
///
/// ```rust
/// use dotgraft::metadata::{tables::TableId, token::Token};
///
/// let token = Token::from_parts(TableId::MethodDef, 1);
/// assert_eq!(token.value(), 0x0600_0001);
/// assert_eq!(token.table_id(), Some(TableId::MethodDef));
/// assert_eq!(token.row(), 1);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Token(pub u32);

impl Token {
    /// The null reference.
    pub const NULL: Token = Token(0);

    /// Largest row a token can address.
    pub const MAX_ROW: u32 = 0x00FF_FFFF;

    /// Create a token from its raw value.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Create a token from a table and a 1-based row.
    #[must_use]
    pub fn from_parts(table: TableId, row: u32) -> Self {
        Token((u32::from(table as u8) << 24) | (row & Self::MAX_ROW))
    }

    /// The raw 32-bit value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The raw table byte.
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The table this token addresses, if the table byte is a known table.
    #[must_use]
    pub fn table_id(&self) -> Option<TableId> {
        TableId::from_repr(self.table())
    }

    /// The 1-based row.
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & Self::MAX_ROW
    }

    /// Returns `true` for the null reference (row `0`).
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row() == 0
    }

    /// Returns `true` if this token is a non-null reference into `table`.
    #[must_use]
    pub fn is_table(&self, table: TableId) -> bool {
        !self.is_null() && self.table() == table as u8
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_token_parts() {
        let token = Token::new(0x0600_0001);
        assert_eq!(token.table(), 0x06);
        assert_eq!(token.table_id(), Some(TableId::MethodDef));
        assert_eq!(token.row(), 1);

        let token = Token::from_parts(TableId::TypeSpec, 0x00FF_FFFF);
        assert_eq!(token.value(), 0x1BFF_FFFF);
    }

    #[test]
    fn test_token_is_null() {
        assert!(Token::NULL.is_null());
        assert!(Token(0x0100_0000).is_null());
        assert!(!Token(0x0600_0001).is_null());
    }

    #[test]
    fn test_token_is_table() {
        let token = Token::from_parts(TableId::TypeRef, 3);
        assert!(token.is_table(TableId::TypeRef));
        assert!(!token.is_table(TableId::TypeDef));
        assert!(!Token::from_parts(TableId::TypeRef, 0).is_table(TableId::TypeRef));
    }

    #[test]
    fn test_token_unknown_table() {
        assert_eq!(Token(0x7F00_0001).table_id(), None);
    }

    #[test]
    fn test_token_from_conversion() {
        let value = 0x0600_0001u32;
        let token: Token = value.into();
        assert_eq!(token.value(), value);

        let back_to_u32: u32 = token.into();
        assert_eq!(back_to_u32, value);
    }

    #[test]
    fn test_token_display() {
        assert_eq!(format!("{}", Token(0x0600_0001)), "0x06000001");
        assert_eq!(format!("{}", Token::NULL), "0x00000000");
    }

    #[test]
    fn test_token_debug() {
        let debug_str = format!("{:?}", Token(0x0600_0001));
        assert!(debug_str.contains("Token(0x06000001"));
        assert!(debug_str.contains("table: 0x06"));
        assert!(debug_str.contains("row: 1"));
    }

    #[test]
    fn test_token_ordering() {
        let token1 = Token(0x0600_0001);
        let token2 = Token(0x0600_0002);
        let token3 = Token(0x0700_0001);

        assert!(token1 < token2);
        assert!(token2 < token3);
    }

    #[test]
    fn test_token_hash() {
        let mut map = HashMap::new();
        map.insert(Token(0x0600_0001), "Method1");
        map.insert(Token(0x0600_0002), "Method2");

        assert_eq!(map.get(&Token(0x0600_0001)), Some(&"Method1"));
        assert_eq!(map.get(&Token(0x0600_0002)), Some(&"Method2"));
    }
}
