//! 加入時的名稱檢查

use crate::ai::BOT_USERNAME;

const MIN_USERNAME_LEN: usize = 1;
const MAX_USERNAME_LEN: usize = 50;

/// 名稱不合法
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsernameError {
    #[error("Invalid username. Must be 1-50 characters.")]
    Empty,
    #[error("Invalid username. Must be 1-50 characters, got {0}.")]
    TooLong(usize),
    #[error("Invalid username. Only letters, digits, space, '-' and '_' are allowed (found {0:?}).")]
    InvalidCharacter(char),
    #[error("Username {0:?} is reserved.")]
    Reserved(String),
}

/// 驗證名稱：1-50 字元，只允許 ASCII 英數、空白、`-` 與 `_`
pub fn validate_username(username: &str) -> Result<&str, UsernameError> {
    let len = username.chars().count();
    if len < MIN_USERNAME_LEN {
        return Err(UsernameError::Empty);
    }
    if len > MAX_USERNAME_LEN {
        return Err(UsernameError::TooLong(len));
    }

    if let Some(bad) = username.chars().find(|&c| !is_username_char(c)) {
        return Err(UsernameError::InvalidCharacter(bad));
    }

    // bot 的名稱，不分大小寫
    if username.eq_ignore_ascii_case(BOT_USERNAME) {
        return Err(UsernameError::Reserved(username.to_string()));
    }

    Ok(username)
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert_eq!(validate_username("alice"), Ok("alice"));
        assert_eq!(validate_username("Bob_the-2nd"), Ok("Bob_the-2nd"));
        assert_eq!(validate_username("a b"), Ok("a b"));
        assert!(validate_username(&"x".repeat(50)).is_ok());
    }

    #[test]
    fn test_length_limits() {
        assert_eq!(validate_username(""), Err(UsernameError::Empty));
        assert_eq!(
            validate_username(&"x".repeat(51)),
            Err(UsernameError::TooLong(51))
        );
    }

    #[test]
    fn test_invalid_characters() {
        assert_eq!(
            validate_username("alice!"),
            Err(UsernameError::InvalidCharacter('!'))
        );
        assert_eq!(
            validate_username("<script>"),
            Err(UsernameError::InvalidCharacter('<'))
        );
        assert_eq!(
            validate_username("café"),
            Err(UsernameError::InvalidCharacter('é'))
        );
    }

    #[test]
    fn test_bot_name_is_reserved() {
        assert_eq!(
            validate_username("BOT"),
            Err(UsernameError::Reserved("BOT".to_string()))
        );
        assert!(matches!(
            validate_username("bot"),
            Err(UsernameError::Reserved(_))
        ));
        assert_eq!(validate_username("bot2"), Ok("bot2"));
        assert_eq!(validate_username("robot"), Ok("robot"));
    }

    #[test]
    fn test_error_message_is_user_facing() {
        let msg = UsernameError::Empty.to_string();
        assert!(msg.contains("1-50"));
    }
}
