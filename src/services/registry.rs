//! Static task catalogue.
//!
//! The pipeline topology is fixed: 21 analysis tasks across four ordered
//! stages, with stage 1 split into three strictly sequential sub-steps
//! because the deep-analysis instructions reference collect/context outputs
//! by task id. Dispatch order within a stage follows catalogue order.

use crate::domain::models::{CallWeight, ConcurrencyPolicy, StagePlan};

/// Immutable description of one catalogue task.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub id: &'static str,
    pub title: &'static str,
    pub stage: u8,
    pub step: u8,
    pub group: &'static str,
    pub weight: CallWeight,
    /// Static instruction template sent with every analysis request.
    pub instruction: &'static str,
}

/// The full catalogue in dispatch order.
const CATALOGUE: &[TaskSpec] = &[
    // Stage 1, step 1: raw data collection.
    TaskSpec {
        id: "price-history",
        title: "Price and volume history",
        stage: 1,
        step: 1,
        group: "collect",
        weight: CallWeight::Light,
        instruction: "Summarize the last year of daily price and volume action: trend phases, \
                      drawdowns, volume anomalies, and the current level relative to the range.",
    },
    TaskSpec {
        id: "realtime-quote",
        title: "Real-time quote",
        stage: 1,
        step: 1,
        group: "collect",
        weight: CallWeight::Light,
        instruction: "Describe the current quote: price, day change, turnover, and intraday \
                      behavior versus the recent norm.",
    },
    TaskSpec {
        id: "financial-statements",
        title: "Financial statements",
        stage: 1,
        step: 1,
        group: "collect",
        weight: CallWeight::Light,
        instruction: "Extract the headline figures from the latest financial statements: \
                      revenue, profit, margins, cash flow, and debt, each with year-over-year \
                      deltas.",
    },
    TaskSpec {
        id: "fund-flow",
        title: "Fund flow",
        stage: 1,
        step: 1,
        group: "collect",
        weight: CallWeight::Light,
        instruction: "Report institutional and retail fund flows over the past month and flag \
                      sustained accumulation or distribution.",
    },
    // Stage 1, step 2: industry and macro context.
    TaskSpec {
        id: "industry-landscape",
        title: "Industry landscape",
        stage: 1,
        step: 2,
        group: "context",
        weight: CallWeight::Standard,
        instruction: "Position the company within its industry: competitive structure, market \
                      share trend, pricing power, and regulatory posture. Use the \
                      financial-statements output for scale context.",
    },
    TaskSpec {
        id: "peer-comparison",
        title: "Peer comparison",
        stage: 1,
        step: 2,
        group: "context",
        weight: CallWeight::Standard,
        instruction: "Compare valuation and growth against the three closest listed peers, \
                      using the financial-statements output as the anchor.",
    },
    TaskSpec {
        id: "macro-environment",
        title: "Macro environment",
        stage: 1,
        step: 2,
        group: "context",
        weight: CallWeight::Standard,
        instruction: "Assess the macro backdrop relevant to this name: rates, credit, sector \
                      policy, and currency exposure.",
    },
    // Stage 1, step 3: deep analysis over the collected base.
    TaskSpec {
        id: "technical-signals",
        title: "Technical signals",
        stage: 1,
        step: 3,
        group: "deep",
        weight: CallWeight::Heavy,
        instruction: "Derive the technical picture from the price-history output: trend, \
                      momentum, support and resistance, and any divergence against the \
                      fund-flow output.",
    },
    TaskSpec {
        id: "fundamental-quality",
        title: "Fundamental quality",
        stage: 1,
        step: 3,
        group: "deep",
        weight: CallWeight::Heavy,
        instruction: "Judge earnings quality and durability from the financial-statements and \
                      industry-landscape outputs: accruals, margin trajectory, and moat \
                      evidence.",
    },
    TaskSpec {
        id: "capital-structure",
        title: "Capital structure",
        stage: 1,
        step: 3,
        group: "deep",
        weight: CallWeight::Heavy,
        instruction: "Analyze leverage, maturity walls, dilution history, and buyback capacity \
                      from the financial-statements output.",
    },
    // Stage 2: perspective sweep, after the directional debate.
    TaskSpec {
        id: "sentiment-pulse",
        title: "Sentiment pulse",
        stage: 2,
        step: 1,
        group: "perspective",
        weight: CallWeight::Standard,
        instruction: "Gauge current market sentiment for the name across research, social, and \
                      positioning data.",
    },
    TaskSpec {
        id: "news-catalysts",
        title: "News catalysts",
        stage: 2,
        step: 1,
        group: "perspective",
        weight: CallWeight::Standard,
        instruction: "List upcoming and recent catalysts: earnings dates, product launches, \
                      policy decisions, and lockup expiries.",
    },
    TaskSpec {
        id: "institutional-activity",
        title: "Institutional activity",
        stage: 2,
        step: 1,
        group: "perspective",
        weight: CallWeight::Standard,
        instruction: "Summarize institutional ownership changes, block trades, and analyst \
                      revision momentum.",
    },
    TaskSpec {
        id: "growth-outlook",
        title: "Growth outlook",
        stage: 2,
        step: 1,
        group: "perspective",
        weight: CallWeight::Standard,
        instruction: "Project the medium-term growth path: drivers, capacity, and the \
                      consensus trajectory, referencing the fundamental-quality output.",
    },
    // Stage 3: expensive valuation work, batched to cap backend load.
    TaskSpec {
        id: "valuation-model",
        title: "Valuation model",
        stage: 3,
        step: 1,
        group: "valuation",
        weight: CallWeight::Heavy,
        instruction: "Build a multi-method valuation (DCF, comparables, dividend capacity) and \
                      reconcile the methods into a fair-value range.",
    },
    TaskSpec {
        id: "earnings-forecast",
        title: "Earnings forecast",
        stage: 3,
        step: 1,
        group: "valuation",
        weight: CallWeight::Heavy,
        instruction: "Forecast the next four quarters of revenue and earnings with explicit \
                      drivers, anchored on the growth-outlook output.",
    },
    TaskSpec {
        id: "scenario-stress",
        title: "Scenario stress",
        stage: 3,
        step: 1,
        group: "valuation",
        weight: CallWeight::Heavy,
        instruction: "Stress the valuation under bear, base, and bull scenarios and state the \
                      probability-weighted expected value.",
    },
    TaskSpec {
        id: "risk-matrix",
        title: "Risk matrix",
        stage: 3,
        step: 1,
        group: "valuation",
        weight: CallWeight::Heavy,
        instruction: "Enumerate the principal risks with likelihood and impact ratings, \
                      drawing on the macro-environment and capital-structure outputs.",
    },
    // Stage 4: strategy synthesis over everything.
    TaskSpec {
        id: "strategy-synthesis",
        title: "Strategy synthesis",
        stage: 4,
        step: 1,
        group: "strategy",
        weight: CallWeight::Standard,
        instruction: "Synthesize all prior outputs into an investment thesis with a clear \
                      stance and its strongest counterargument.",
    },
    TaskSpec {
        id: "position-plan",
        title: "Position plan",
        stage: 4,
        step: 1,
        group: "strategy",
        weight: CallWeight::Standard,
        instruction: "Propose position sizing, entry zones, invalidation levels, and a review \
                      cadence consistent with the scenario-stress output.",
    },
    TaskSpec {
        id: "executive-brief",
        title: "Executive brief",
        stage: 4,
        step: 1,
        group: "strategy",
        weight: CallWeight::Standard,
        instruction: "Condense the full analysis into a one-page brief: thesis, valuation, \
                      risks, and plan.",
    },
];

/// Fixed cosmetic progress scripts per group: {icon, label} sequences the
/// runner emits at one-second cadence while a task is in flight.
const PROGRESS_SCRIPTS: &[(&str, &[(&str, &str)])] = &[
    (
        "collect",
        &[
            ("⏳", "requesting source data"),
            ("📡", "normalizing series"),
            ("🔍", "checking for gaps"),
        ],
    ),
    (
        "context",
        &[
            ("🏭", "mapping the industry"),
            ("📊", "lining up comparables"),
            ("🌐", "reading the macro tape"),
        ],
    ),
    (
        "deep",
        &[
            ("🧮", "crunching indicators"),
            ("📈", "fitting the trend"),
            ("🧾", "cross-checking statements"),
            ("⚖️", "weighing the evidence"),
        ],
    ),
    (
        "perspective",
        &[
            ("📰", "scanning coverage"),
            ("💬", "sampling sentiment"),
            ("🏦", "tracking positioning"),
        ],
    ),
    (
        "valuation",
        &[
            ("📐", "building the model"),
            ("🎯", "calibrating assumptions"),
            ("🎲", "running scenarios"),
            ("📉", "stress testing"),
        ],
    ),
    (
        "strategy",
        &[
            ("🧭", "setting the stance"),
            ("🗺️", "drafting the plan"),
            ("✍️", "writing the brief"),
        ],
    ),
];

/// Static catalogue accessor.
pub struct TaskRegistry;

impl TaskRegistry {
    /// All task specs in dispatch order.
    pub fn specs() -> &'static [TaskSpec] {
        CATALOGUE
    }

    /// Look up one spec by id.
    pub fn spec(id: &str) -> Option<&'static TaskSpec> {
        CATALOGUE.iter().find(|spec| spec.id == id)
    }

    /// Task ids for one (stage, step) pair, in dispatch order.
    pub fn step_ids(stage: u8, step: u8) -> Vec<&'static str> {
        CATALOGUE
            .iter()
            .filter(|spec| spec.stage == stage && spec.step == step)
            .map(|spec| spec.id)
            .collect()
    }

    /// The ordered stage plans making up one run. Debates are interleaved by
    /// the pipeline after stage 1 (directional) and stage 2 (risk).
    pub fn stage_plans(batch_size: usize) -> Vec<StagePlan> {
        vec![
            StagePlan {
                stage: 1,
                step: 1,
                label: "collect",
                policy: ConcurrencyPolicy::FullParallel,
                tasks: Self::step_ids(1, 1),
            },
            StagePlan {
                stage: 1,
                step: 2,
                label: "context",
                policy: ConcurrencyPolicy::FullParallel,
                tasks: Self::step_ids(1, 2),
            },
            StagePlan {
                stage: 1,
                step: 3,
                label: "deep",
                policy: ConcurrencyPolicy::FullParallel,
                tasks: Self::step_ids(1, 3),
            },
            StagePlan {
                stage: 2,
                step: 1,
                label: "perspective",
                policy: ConcurrencyPolicy::FullParallel,
                tasks: Self::step_ids(2, 1),
            },
            StagePlan {
                stage: 3,
                step: 1,
                label: "valuation",
                policy: ConcurrencyPolicy::Batched(batch_size),
                tasks: Self::step_ids(3, 1),
            },
            StagePlan {
                stage: 4,
                step: 1,
                label: "strategy",
                policy: ConcurrencyPolicy::FullParallel,
                tasks: Self::step_ids(4, 1),
            },
        ]
    }

    /// Progress script for a group. Unknown groups get an empty script.
    pub fn progress_script(group: &str) -> &'static [(&'static str, &'static str)] {
        PROGRESS_SCRIPTS
            .iter()
            .find(|(name, _)| *name == group)
            .map_or(&[], |(_, script)| script)
    }
}
