use {
    crate::*,
    rand::{rngs::StdRng, SeedableRng},
    std::{
        alloc::{GlobalAlloc, Layout, System},
        fmt::Write,
        hint::black_box,
        sync::atomic::{AtomicUsize, Ordering},
        time::{Duration, Instant},
    },
    strum::{EnumCount, EnumIter, IntoEnumIterator},
};

static ALLOCATED: AtomicUsize = AtomicUsize::new(0_usize);
static PEAK: AtomicUsize = AtomicUsize::new(0_usize);

/// A `System` wrapper that tracks live and peak heap usage.
///
/// Solver runs are strictly sequential (no parallelism anywhere in the crate), so the peak
/// observed between `reset_peak` and `peak_bytes` belongs to the bracketed call alone.
pub struct TrackingAllocator;

impl TrackingAllocator {
    /// Restarts the peak watermark at the currently live amount.
    pub fn reset_peak() {
        PEAK.store(ALLOCATED.load(Ordering::Relaxed), Ordering::Relaxed);
    }

    pub fn peak_bytes() -> usize {
        PEAK.load(Ordering::Relaxed)
    }
}

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr: *mut u8 = System.alloc(layout);

        if !ptr.is_null() {
            let live: usize = ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();

            PEAK.fetch_max(live, Ordering::Relaxed);
        }

        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        ALLOCATED.fetch_sub(layout.size(), Ordering::Relaxed);
    }
}

#[derive(Clone, Copy, Debug, EnumCount, EnumIter, Eq, PartialEq)]
pub enum Strategy {
    TopDownArray,
    TopDownMap,
    BottomUp,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopDownArray => "top-down array",
            Self::TopDownMap => "top-down map",
            Self::BottomUp => "bottom-up",
        }
    }

    /// Runs the strategy, flattening the differing result shapes into `(best, states)`. For the
    /// bottom-up solver, `states` is its table entry count.
    pub fn solve(self, board: &Board) -> (u32, u64) {
        match self {
            Self::TopDownArray => {
                let exploration: Exploration = top_down_array(board);

                (exploration.best, exploration.states_visited)
            }
            Self::TopDownMap => {
                let exploration: Exploration = top_down_map(board);

                (exploration.best, exploration.states_visited)
            }
            Self::BottomUp => {
                let tabulation: Tabulation = bottom_up(board);

                (tabulation.best, tabulation.table_entries as u64)
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Measurement {
    pub strategy: Strategy,
    pub best: u32,
    pub states: u64,
    pub mean_time: Duration,
    pub peak_memory: usize,
}

/// Measures one strategy against a board: peak transient heap during one representative call,
/// then wall time averaged over `repetitions` further sequential calls.
pub fn measure(board: &Board, strategy: Strategy, repetitions: u32) -> Measurement {
    TrackingAllocator::reset_peak();

    let (best, states): (u32, u64) = black_box(strategy.solve(board));
    let peak_memory: usize = TrackingAllocator::peak_bytes();
    let repetitions: u32 = repetitions.max(1_u32);
    let mut total_time: Duration = Duration::ZERO;

    for _ in 0_u32..repetitions {
        let start: Instant = Instant::now();

        black_box(strategy.solve(board));
        total_time += start.elapsed();
    }

    Measurement {
        strategy,
        best,
        states,
        mean_time: total_time / repetitions,
        peak_memory,
    }
}

pub fn compare(board: &Board, repetitions: u32) -> Vec<Measurement> {
    Strategy::iter()
        .map(|strategy| measure(board, strategy, repetitions))
        .collect()
}

fn write_report_header(string: &mut String) {
    string.push_str("strategy       | best | states     | avg time (s) | peak (KiB)\n");
    string.push_str("---------------+------+------------+--------------+-----------\n");
}

fn write_report_row(string: &mut String, measurement: &Measurement) {
    writeln!(
        string,
        "{:<15}| {:>4} | {:>10} | {:>12.6} | {:>10.1}",
        measurement.strategy.as_str(),
        measurement.best,
        measurement.states,
        measurement.mean_time.as_secs_f64(),
        measurement.peak_memory as f64 / 1024.0_f64,
    )
    .unwrap();
}

pub fn render_report(measurements: &[Measurement]) -> String {
    let mut string: String = String::new();

    write_report_header(&mut string);

    for measurement in measurements {
        write_report_row(&mut string, measurement);
    }

    string
}

#[derive(Clone, Debug)]
pub struct SweepConfig {
    pub side_lens: Vec<usize>,
    pub instances: u32,
    pub bomb_prob: f64,
    pub radaway_prob: f64,
    pub seed: u64,
    pub repetitions: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            side_lens: vec![5_usize, 10_usize, 20_usize, 40_usize],
            instances: 3_u32,
            bomb_prob: 0.2_f64,
            radaway_prob: 0.2_f64,
            seed: 0_u64,
            repetitions: 3_u32,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SweepRow {
    pub side_len: usize,
    pub strategy: Strategy,
    pub mean_best: f64,
    pub mean_states: f64,
    pub mean_time: Duration,
    pub mean_peak_memory: f64,
}

/// Generates `instances` seeded random boards per side length and averages every metric per
/// `(side length, strategy)` pair.
pub fn sweep(config: &SweepConfig) -> Vec<SweepRow> {
    let mut rng: StdRng = StdRng::seed_from_u64(config.seed);
    let instances: u32 = config.instances.max(1_u32);
    let mut rows: Vec<SweepRow> = Vec::with_capacity(config.side_lens.len() * Strategy::COUNT);

    for side_len in config.side_lens.iter().copied() {
        let boards: Vec<Board> = (0_u32..instances)
            .map(|_| Board::generate(side_len, config.bomb_prob, config.radaway_prob, &mut rng))
            .collect();

        for strategy in Strategy::iter() {
            let mut total_best: f64 = 0.0_f64;
            let mut total_states: f64 = 0.0_f64;
            let mut total_time: Duration = Duration::ZERO;
            let mut total_peak_memory: f64 = 0.0_f64;

            for board in &boards {
                let measurement: Measurement = measure(board, strategy, config.repetitions);

                total_best += measurement.best as f64;
                total_states += measurement.states as f64;
                total_time += measurement.mean_time;
                total_peak_memory += measurement.peak_memory as f64;
            }

            rows.push(SweepRow {
                side_len,
                strategy,
                mean_best: total_best / instances as f64,
                mean_states: total_states / instances as f64,
                mean_time: total_time / instances,
                mean_peak_memory: total_peak_memory / instances as f64,
            });
        }
    }

    rows
}

/// Renders sweep rows grouped by side length.
pub fn render_sweep_report(rows: &[SweepRow]) -> String {
    let mut string: String = String::new();
    let mut curr_side_len: Option<usize> = None;

    for row in rows {
        if curr_side_len != Some(row.side_len) {
            curr_side_len = Some(row.side_len);
            writeln!(&mut string, "\nn = {}", row.side_len).unwrap();
            string.push_str(
                "strategy       | mean best | mean states  | avg time (s) | peak (KiB)\n",
            );
        }

        writeln!(
            &mut string,
            "{:<15}| {:>9.2} | {:>12.1} | {:>12.6} | {:>10.1}",
            row.strategy.as_str(),
            row.mean_best,
            row.mean_states,
            row.mean_time.as_secs_f64(),
            row.mean_peak_memory / 1024.0_f64,
        )
        .unwrap();
    }

    string
}
