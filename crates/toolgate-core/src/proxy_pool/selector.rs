//! Proxy selection strategies.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use toolgate_types::SelectorKind;

/// Healthy, domain-matching proxy offered to a selector, in pool insertion order.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub url: &'a str,
    pub average_latency_ms: f64,
}

/// Picks one candidate. Callers only invoke `select` with a non-empty slice.
pub trait ProxySelector: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> SelectorKind;

    /// Index into `candidates`, or `None` when it is empty.
    fn select(&self, candidates: &[Candidate<'_>]) -> Option<usize>;
}

/// Cycles through candidates with a shared counter.
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    counter: AtomicUsize,
}

impl ProxySelector for RoundRobinSelector {
    fn kind(&self) -> SelectorKind {
        SelectorKind::RoundRobin
    }

    fn select(&self, candidates: &[Candidate<'_>]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        Some(self.counter.fetch_add(1, Ordering::Relaxed) % candidates.len())
    }
}

/// Lowest average latency; ties go to the earliest inserted proxy.
/// Proxies without successful requests report `+inf` and lose to any measured one.
#[derive(Debug, Default)]
pub struct LatencyBasedSelector;

impl ProxySelector for LatencyBasedSelector {
    fn kind(&self) -> SelectorKind {
        SelectorKind::LatencyBased
    }

    fn select(&self, candidates: &[Candidate<'_>]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, candidate) in candidates.iter().enumerate() {
            match best {
                Some((_, latency)) if candidate.average_latency_ms >= latency => {},
                _ => best = Some((idx, candidate.average_latency_ms)),
            }
        }
        best.map(|(idx, _)| idx)
    }
}

#[derive(Debug, Default)]
pub struct RandomSelector;

impl ProxySelector for RandomSelector {
    fn kind(&self) -> SelectorKind {
        SelectorKind::Random
    }

    fn select(&self, candidates: &[Candidate<'_>]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        Some(rand::thread_rng().gen_range(0..candidates.len()))
    }
}

pub fn selector_for(kind: SelectorKind) -> Box<dyn ProxySelector> {
    match kind {
        SelectorKind::RoundRobin => Box::<RoundRobinSelector>::default(),
        SelectorKind::LatencyBased => Box::new(LatencyBasedSelector),
        SelectorKind::Random => Box::new(RandomSelector),
    }
}
