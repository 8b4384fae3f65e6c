//! Metrics definitions for the aggregation pipeline.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub description: &'static str,
}

#[macro_export]
macro_rules! counter {
    ($def:expr) => {
        metrics::counter!($def.name)
    };
}

#[macro_export]
macro_rules! histogram {
    ($def:expr) => {
        metrics::histogram!($def.name)
    };
}

pub const PAGES_FETCHED: MetricDef = MetricDef {
    name: "paginator.pages_fetched",
    metric_type: MetricType::Counter,
    description: "Number of experience listing pages fetched",
};

pub const PAGINATION_ABORTED: MetricDef = MetricDef {
    name: "paginator.aborted",
    metric_type: MetricType::Counter,
    description: "Number of listing loops cut short by an upstream failure",
};

pub const RESOLVER_FALLBACK_HIT: MetricDef = MetricDef {
    name: "resolver.fallback_hit",
    metric_type: MetricType::Counter,
    description: "Number of gamepass listings served by a non-primary variant",
};

pub const RESOLVER_EXHAUSTED: MetricDef = MetricDef {
    name: "resolver.exhausted",
    metric_type: MetricType::Counter,
    description: "Number of experiences for which every listing variant came up empty",
};

pub const DETAIL_FALLBACK_HIT: MetricDef = MetricDef {
    name: "enricher.fallback_hit",
    metric_type: MetricType::Counter,
    description: "Number of detail lookups served by the economy asset endpoint",
};

pub const DETAIL_DEFAULTED: MetricDef = MetricDef {
    name: "enricher.defaulted",
    metric_type: MetricType::Counter,
    description: "Number of detail lookups that fell back to the unknown record",
};

pub const PIPELINE_DURATION: MetricDef = MetricDef {
    name: "pipeline.duration",
    metric_type: MetricType::Histogram,
    description: "Time to complete one aggregation run in seconds",
};

pub const EXPERIENCES_PER_RUN: MetricDef = MetricDef {
    name: "pipeline.experiences",
    metric_type: MetricType::Histogram,
    description: "Number of experiences discovered per aggregation run",
};

pub const GAMEPASSES_PER_RUN: MetricDef = MetricDef {
    name: "pipeline.gamepasses",
    metric_type: MetricType::Histogram,
    description: "Number of gamepass records returned per aggregation run",
};

// Every metric the crate records must be listed here so the binary can
// register descriptions at startup.
pub const ALL_METRICS: &[MetricDef] = &[
    PAGES_FETCHED,
    PAGINATION_ABORTED,
    RESOLVER_FALLBACK_HIT,
    RESOLVER_EXHAUSTED,
    DETAIL_FALLBACK_HIT,
    DETAIL_DEFAULTED,
    PIPELINE_DURATION,
    EXPERIENCES_PER_RUN,
    GAMEPASSES_PER_RUN,
];
