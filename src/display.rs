//! Display helpers for the tagging collaborator
//!
//! 价格核心不负责打标；这里只提供与宿主一致的文本格式，
//! 让 lore 注入方在多次调用时保持幂等 (不重复追加 "Worth:" 行)。

pub const WORTH_PREFIX: &str = "Worth: ";

/// 宿主颜色码前缀
const COLOR_CHAR: char = '§';

/// `WHITE_WOOL` → `White Wool`
pub fn format_item_name(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// 千位分隔 (en-US)
pub fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// 不含颜色码的 lore 文本：`Worth: $1,234`
pub fn worth_line(price: u64, currency_symbol: &str) -> String {
    format!("{}{}{}", WORTH_PREFIX, currency_symbol, group_digits(price))
}

/// 去除 `§x` 颜色码
pub fn strip_color(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(ch) = chars.next() {
        if ch == COLOR_CHAR {
            chars.next();
            continue;
        }
        out.push(ch);
    }
    out
}

/// lore 中是否已存在 worth 行
pub fn has_worth_line<S: AsRef<str>>(lore: &[S]) -> bool {
    lore.iter()
        .any(|line| strip_color(line.as_ref()).starts_with(WORTH_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_names_are_title_cased() {
        assert_eq!(format_item_name("WHITE_WOOL"), "White Wool");
        assert_eq!(format_item_name("NETHER_STAR"), "Nether Star");
        assert_eq!(format_item_name("ELYTRA"), "Elytra");
        assert_eq!(format_item_name("__ODD__NAME"), "Odd Name");
    }

    #[test]
    fn worth_lines_use_us_grouping() {
        assert_eq!(worth_line(7, "$"), "Worth: $7");
        assert_eq!(worth_line(1234, "$"), "Worth: $1,234");
        assert_eq!(worth_line(1_000_000, "€"), "Worth: €1,000,000");
        assert_eq!(group_digits(100), "100");
        assert_eq!(group_digits(0), "0");
    }

    #[test]
    fn detects_existing_worth_lines_through_color_codes() {
        let lore = vec!["§7Sharp".to_string(), "§7Worth: §a$12".to_string()];
        assert!(has_worth_line(&lore));
        assert!(!has_worth_line(&["Worthless junk"]));
        assert!(!has_worth_line::<&str>(&[]));
    }
}
