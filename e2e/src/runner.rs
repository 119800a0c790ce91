//! Sequential test execution with a per-category report
//!
//! Each case runs against a freshly reset mock upstream. The report counts how
//! many completion requests the relay made for each case, so a fallback test
//! that passes with the wrong number of attempts is still visible at a glance.

use colored::Colorize;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use crate::types::{SharedBackendState, TestResult};

pub type TestFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

pub struct TestCase {
    /// `<category>/<case>`
    pub name: &'static str,
    pub description: &'static str,
    pub run: Box<dyn Fn(TestContext) -> TestFuture + Send + Sync>,
}

impl TestCase {
    pub fn category(&self) -> &'static str {
        self.name.split_once('/').map_or(self.name, |(category, _)| category)
    }
}

/// What every case gets: where the relay listens and the mock upstream handle
#[derive(Clone)]
pub struct TestContext {
    pub relay_addr: String,
    pub backend_state: SharedBackendState,
    pub http_client: reqwest::Client,
}

#[derive(Default)]
struct CategoryTally {
    passed: usize,
    failed: usize,
    upstream_attempts: usize,
}

/// Results of one run, grouped by category for the summary table
pub struct Report {
    pub results: Vec<TestResult>,
}

impl Report {
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(TestResult::passed)
    }

    fn tallies(&self) -> BTreeMap<&'static str, CategoryTally> {
        let mut tallies: BTreeMap<&'static str, CategoryTally> = BTreeMap::new();
        for result in &self.results {
            let tally = tallies.entry(result.category).or_default();
            if result.passed() {
                tally.passed += 1;
            } else {
                tally.failed += 1;
            }
            tally.upstream_attempts += result.upstream_attempts;
        }
        tallies
    }

    pub fn print_summary(&self) {
        println!();
        println!("  {:<14} {:>6} {:>6} {:>9}", "category", "pass", "fail", "upstream");
        for (category, tally) in self.tallies() {
            let line = format!(
                "  {:<14} {:>6} {:>6} {:>9}",
                category, tally.passed, tally.failed, tally.upstream_attempts
            );
            if tally.failed == 0 {
                println!("{}", line.green());
            } else {
                println!("{}", line.red().bold());
            }
        }

        for failure in self.results.iter().filter(|r| !r.passed()) {
            println!("  {} {}", "✗".bright_red(), failure.name);
        }
        println!();
    }
}

/// Run the cases whose name contains `filter`, one at a time
pub async fn run_tests(cases: &[TestCase], ctx: &TestContext, filter: Option<&str>) -> Report {
    let selected: Vec<&TestCase> = cases
        .iter()
        .filter(|case| filter.map_or(true, |f| case.name.contains(f)))
        .collect();

    println!(
        "\n{} {} case(s) against relay {}\n",
        "chat-relay e2e:".bold(),
        selected.len(),
        ctx.relay_addr.bright_cyan()
    );

    let mut results = Vec::with_capacity(selected.len());
    for case in selected {
        ctx.backend_state.lock().unwrap().reset();

        let started = Instant::now();
        let outcome = (case.run)(ctx.clone()).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        let upstream_attempts = ctx.backend_state.lock().unwrap().completions_served;

        let result = TestResult {
            name: case.name,
            category: case.category(),
            error: outcome.err().map(|e| format!("{:#}", e)),
            duration_ms,
            upstream_attempts,
        };
        print_result(&result);
        results.push(result);
    }

    Report { results }
}

fn print_result(result: &TestResult) {
    let verdict = if result.passed() {
        "ok  ".green()
    } else {
        "FAIL".red().bold()
    };
    println!(
        "  {} {:<36} {:>5}ms  upstream x{}",
        verdict, result.name, result.duration_ms, result.upstream_attempts
    );
    if let Some(error) = &result.error {
        println!("       {}", error.yellow());
    }
}

pub fn list_tests(cases: &[TestCase]) {
    let mut current = "";
    for case in cases {
        if case.category() != current {
            current = case.category();
            println!("{}", current.bold());
        }
        println!("  {:<36} {}", case.name.bright_cyan(), case.description);
    }
}
