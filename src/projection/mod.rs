//! Cashflow projection: survival curve, nominal schedule and expected cashflows

mod cashflows;
mod context;
mod discount;
mod engine;
mod schedule;
mod survival;
mod timeline;

pub use cashflows::{CashflowComponents, CashflowRecord, ProjectionResult, ProjectionSummary};
pub use context::{
    Discounting, PeriodLength, ProjectionOptions, ValuationContext, DEFAULT_HORIZON_PERIODS,
    DEFAULT_PROBABILITY_FLOOR,
};
pub use discount::DiscountCurve;
pub use engine::ProjectionEngine;
pub use schedule::{CashflowKind, NominalSchedule, ScheduleGenerator, ScheduledAmount};
pub use survival::{DecrementEngine, SurvivalCurve};
pub use timeline::Timeline;
