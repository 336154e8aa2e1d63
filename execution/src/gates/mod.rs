use engine_core::{GuardianMode, ModeProvider};
use engine_instrument::{Instrument, QuoteCache};

use crate::{error::Rejection, intent::OrderIntent};

pub mod cost_gate;
pub mod fat_finger;
pub mod guardian_mode_gate;
pub mod limit_price;
pub mod liquidity;
pub mod margin;
pub mod throttle;

pub use cost_gate::CostGate;
pub use fat_finger::{FatFingerConfig, FatFingerGate};
pub use guardian_mode_gate::GuardianModeGate;
pub use limit_price::LimitPriceGate;
pub use liquidity::{LiquidityConfig, LiquidityGate};
pub use margin::MarginGate;
pub use throttle::{ThrottleConfig, ThrottleGate};

/// Everything a gate needs to evaluate one intent. Built fresh per call from whatever the
/// caller currently has in hand — gates never hold their own reference to these.
pub struct GateContext<'a> {
    pub instrument: &'a Instrument,
    pub quotes: &'a QuoteCache,
    pub now: chrono::DateTime<chrono::Utc>,
    pub current_position_qty: rust_decimal::Decimal,
    pub margin_usage_ceiling: rust_decimal::Decimal,
    pub margin_usage_after: rust_decimal::Decimal,
    pub avg_daily_volume: rust_decimal::Decimal,
}

pub trait Gate {
    fn evaluate(&mut self, intent: &OrderIntent, ctx: &GateContext<'_>) -> Result<(), Rejection>;

    /// Name used in audit records when this gate rejects an intent.
    fn name(&self) -> &'static str;
}

/// Runs every gate in the fixed §4.6 order, short-circuiting (and returning) on the first
/// rejection. Cheap checks are listed first deliberately: a throttle or fat-finger rejection
/// should never pay for a cost-gate evaluation that reads the quote cache and instrument
/// metadata together.
pub struct GateChain<M> {
    pub throttle: ThrottleGate,
    pub fat_finger: FatFingerGate,
    pub limit_price: LimitPriceGate,
    pub liquidity: LiquidityGate,
    pub margin: MarginGate,
    pub guardian_mode: GuardianModeGate<M>,
    pub cost: CostGate,
}

impl<M: ModeProvider> GateChain<M> {
    pub fn evaluate(&mut self, intent: &OrderIntent, ctx: &GateContext<'_>) -> Result<(), (Rejection, &'static str)> {
        macro_rules! run {
            ($gate:expr) => {
                if let Err(rejection) = $gate.evaluate(intent, ctx) {
                    return Err((rejection, $gate.name()));
                }
            };
        }

        run!(self.throttle);
        run!(self.fat_finger);
        run!(self.limit_price);
        run!(self.liquidity);
        run!(self.margin);
        run!(self.guardian_mode);
        run!(self.cost);
        Ok(())
    }
}

pub(crate) fn mode_allows(mode: GuardianMode, intent_reduces_exposure: bool) -> bool {
    match mode {
        GuardianMode::Init => false,
        GuardianMode::Running => true,
        GuardianMode::ReduceOnly => intent_reduces_exposure,
        GuardianMode::Halted | GuardianMode::Manual => false,
    }
}
