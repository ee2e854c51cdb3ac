// src/fetch/urls.rs

use crate::{error::Result, language::Language};
use url::Url;

/// Drop the visual separators from a table identifier: `14-10-0287` and
/// `14 10 0287` both become `14100287`.
pub fn normalize_table_id(table_id: &str) -> String {
    table_id.chars().filter(|c| !matches!(c, '-' | ' ')).collect()
}

/// `<base><clean-id>-<lang>.zip`
///
/// `base` should end with `/`, otherwise its last segment is replaced.
pub fn table_url(base: &Url, table_id: &str, language: Language) -> Result<Url> {
    let file = format!("{}-{}.zip", normalize_table_id(table_id), language.tag());
    Ok(base.join(&file)?)
}
