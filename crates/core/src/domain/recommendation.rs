/// Maps an analyst recommendation key onto a -1/0/1 scale.
///
/// Only the exact lowercase keys `buy`, `hold` and `sell` are recognised. Anything else
/// (`strong_buy`, `none`, `BUY`, the empty string) scores as neutral.
pub fn recommendation_score(key: &str) -> i64 {
    match key {
        "buy" => 1,
        "hold" => 0,
        "sell" => -1,
        _ => 0,
    }
}
