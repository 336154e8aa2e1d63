use engine_execution::intent::OrderIntent;
use engine_execution::position::PositionTracker;
use engine_execution::ids::StrategyId;
use engine_instrument::{Offset, QuoteCache, Side};
use rust_decimal::Decimal;

/// Builds the ordered set of closing intents that flattens every open position, reducing
/// today's lots before carried-over ones per the same rule the position tracker itself closes
/// by. A symbol with no live quote is skipped — there is nothing to plan an aggressive
/// crossing price against — and is left for the next tick to retry.
pub fn plan_flatten(positions: &PositionTracker, quotes: &QuoteCache) -> Vec<OrderIntent> {
    let mut intents = Vec::new();

    for (symbol, position) in positions.iter() {
        let Some(quote) = quotes.get(symbol) else { continue };

        if !position.long_qty.is_zero() {
            push_closing_legs(&mut intents, symbol.clone(), Side::Sell, quote.bid, position.long_today_qty, position.long_qty);
        }
        if !position.short_qty.is_zero() {
            push_closing_legs(&mut intents, symbol.clone(), Side::Buy, quote.ask, position.short_today_qty, position.short_qty);
        }
    }

    intents
}

fn push_closing_legs(
    intents: &mut Vec<OrderIntent>,
    symbol: engine_instrument::Symbol,
    closing_side: Side,
    price: Decimal,
    today_qty: Decimal,
    total_qty: Decimal,
) {
    let overnight_qty = total_qty - today_qty;
    if !today_qty.is_zero() {
        intents.push(flatten_intent(symbol.clone(), closing_side, Offset::CloseToday, price, today_qty));
    }
    if !overnight_qty.is_zero() {
        intents.push(flatten_intent(symbol, closing_side, Offset::Close, price, overnight_qty));
    }
}

fn flatten_intent(symbol: engine_instrument::Symbol, side: Side, offset: Offset, price: Decimal, qty: Decimal) -> OrderIntent {
    OrderIntent {
        symbol,
        side,
        offset,
        price,
        qty,
        reason: "guardian_flatten".into(),
        strategy_id: StrategyId::new("guardian"),
        signal_edge: None,
    }
}
