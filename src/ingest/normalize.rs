use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::types::RawTable;

/// Canonical header form: trimmed, lowercase, spaces and slashes turned into
/// underscores, then folded to ASCII (NFKD, non-ASCII chars dropped).
/// `"  Mês/Ano "` becomes `"mes_ano"`, `"Meta do Mês 🎯"` becomes `"meta_do_mes_"`.
///
/// The fold can expose new whitespace, slashes or capitals (a fullwidth slash
/// decomposes to `/`, `ℌ` to `H`), so the ASCII steps run once more after it.
/// On ASCII input that second pass is a no-op, and its output is a fixed point.
pub fn normalize_header(raw: &str) -> String {
    let folded: String = ascii_steps(raw).nfkd().filter(char::is_ascii).collect();
    ascii_steps(&folded)
}

fn ascii_steps(s: &str) -> String {
    s.trim().to_lowercase().replace(' ', "_").replace('/', "_")
}

/// Rewrites headers only; row data is untouched.
pub fn normalize_table(mut table: RawTable) -> RawTable {
    let normalized: Vec<String> = table.headers.iter().map(|h| normalize_header(h)).collect();
    if normalized != table.headers {
        debug!(
            "Sheet '{}': normalized headers {:?} -> {:?}",
            table.name, table.headers, normalized
        );
    }
    table.headers = normalized;
    table
}
