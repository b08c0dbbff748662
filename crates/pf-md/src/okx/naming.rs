//! OKX instrument naming.
//!
//! OKX spot instruments are `BASE-QUOTE` (`BTC-USDT`). The hyphen cannot occur
//! inside a currency code, so the mapping is injective.

use pf_core::CurrencyPair;

/// OKX spot instId for `pair`, e.g. `BTC-USDT`.
pub fn to_okx_inst_id(pair: &CurrencyPair) -> String {
    format!("{}-{}", pair.base, pair.quote)
}
