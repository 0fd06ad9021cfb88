use {
    clap::Parser,
    radrun::*,
    rand::{rngs::StdRng, SeedableRng},
    std::io::{stdin, stdout, Write},
};

/// Interactive workbench for the RadAway grid run: generate boards, render them, run the three
/// DP strategies, and compare their time/memory/state cost.
#[derive(Debug, Parser)]
struct Args {
    /// Board side length used by the generate option
    #[arg(short = 'n', long, default_value_t = 10_usize)]
    size: usize,

    /// Probability that a generated cell is a bomb
    #[arg(short, long, default_value_t = 0.2_f64)]
    bomb_prob: f64,

    /// Probability that a generated cell is a RadAway
    #[arg(short, long, default_value_t = 0.2_f64)]
    radaway_prob: f64,

    /// RNG seed for board generation
    #[arg(short, long, default_value_t = 0_u64)]
    seed: u64,

    /// Timed repetitions per strategy when comparing
    #[arg(long, default_value_t = 5_u32)]
    repetitions: u32,

    /// Side lengths visited by the size sweep
    #[arg(long, value_delimiter = ',', default_values_t = [5_usize, 10_usize, 20_usize, 40_usize])]
    sweep_sizes: Vec<usize>,

    /// Random board instances per side length in the size sweep
    #[arg(long, default_value_t = 3_u32)]
    sweep_instances: u32,

    /// Render boards without ANSI colors
    #[arg(long)]
    plain: bool,

    /// Board file to load at startup instead of generating one
    #[arg(short, long)]
    input_file_path: Option<String>,
}

struct Menu {
    board: Option<Board>,
    size: usize,
    bomb_prob: f64,
    radaway_prob: f64,
    repetitions: u32,
    sweep_sizes: Vec<usize>,
    sweep_instances: u32,
    color_mode: ColorMode,
    seed: u64,
    rng: StdRng,
}

/// The board generator assumes a side length of at least 1.
fn sanitized_size(size: usize) -> usize {
    if size >= 1_usize {
        size
    } else {
        eprintln!("invalid size {size}, using 1");

        1_usize
    }
}

fn sanitized_probability(probability: f64, default: f64) -> f64 {
    if (0.0_f64..=1.0_f64).contains(&probability) {
        probability
    } else {
        eprintln!("probability {probability} is outside [0, 1], using {default}");

        default
    }
}

impl Menu {
    fn new(args: &Args) -> Self {
        let board: Option<Board> = args
            .input_file_path
            .as_deref()
            .and_then(|file_path: &str| try_load_board(file_path));

        Self {
            board,
            size: sanitized_size(args.size),
            bomb_prob: sanitized_probability(args.bomb_prob, 0.2_f64),
            radaway_prob: sanitized_probability(args.radaway_prob, 0.2_f64),
            repetitions: args.repetitions,
            sweep_sizes: args
                .sweep_sizes
                .iter()
                .map(|size: &usize| sanitized_size(*size))
                .collect(),
            sweep_instances: args.sweep_instances,
            color_mode: if args.plain {
                ColorMode::Plain
            } else {
                ColorMode::Ansi
            },
            seed: args.seed,
            rng: StdRng::seed_from_u64(args.seed),
        }
    }

    fn run(&mut self) {
        loop {
            println!(
                "\n=== RadAway grid run ===\n\
                probabilities: bomb {:.0}%, RadAway {:.0}% | size {} | seed {}\n\
                1. configure probabilities\n\
                2. set board size\n\
                3. generate board\n\
                4. show board\n\
                5. solve: top-down array\n\
                6. solve: top-down map\n\
                7. solve: bottom-up (with path)\n\
                8. compare strategies\n\
                9. size sweep\n\
                10. load board from file\n\
                11. quit",
                self.bomb_prob * 100.0_f64,
                self.radaway_prob * 100.0_f64,
                self.size,
                self.seed,
            );

            match read_line("choose an option (1-11): ").as_str() {
                "1" => self.configure_probabilities(),
                "2" => self.set_size(),
                "3" => self.generate(),
                "4" => self.with_board(|board, color_mode, _| {
                    println!("{}", board.render(color_mode));
                }),
                "5" => self.solve(Strategy::TopDownArray),
                "6" => self.solve(Strategy::TopDownMap),
                "7" => self.bottom_up(),
                "8" => self.with_board(|board, _, repetitions| {
                    println!("{}", render_report(&compare(board, repetitions)));
                }),
                "9" => self.sweep(),
                "10" => self.load_board(),
                "11" | "q" => break,
                _ => println!("invalid option"),
            }
        }
    }

    /// Invalid or out-of-range input keeps the previous probabilities.
    fn configure_probabilities(&mut self) {
        let bomb_prob: Option<f64> = read_probability("bomb probability [0-1]: ");
        let radaway_prob: Option<f64> = read_probability("RadAway probability [0-1]: ");

        match (bomb_prob, radaway_prob) {
            (Some(bomb_prob), Some(radaway_prob)) => {
                self.bomb_prob = bomb_prob;
                self.radaway_prob = radaway_prob;
            }
            _ => println!("invalid probabilities, keeping the previous configuration"),
        }
    }

    fn set_size(&mut self) {
        match read_line("board size: ").parse::<usize>() {
            Ok(size) if size >= 1_usize => self.size = size,
            _ => println!("invalid size, keeping {}", self.size),
        }
    }

    fn generate(&mut self) {
        self.board = Some(Board::generate(
            self.size,
            self.bomb_prob,
            self.radaway_prob,
            &mut self.rng,
        ));
        println!("generated a {0}x{0} board", self.size);
    }

    fn with_board<F: FnOnce(&Board, ColorMode, u32)>(&self, f: F) {
        match self.board.as_ref() {
            Some(board) => f(board, self.color_mode, self.repetitions),
            None => println!("generate or load a board first"),
        }
    }

    fn solve(&self, strategy: Strategy) {
        self.with_board(|board, _, _| {
            let measurement: Measurement = measure(board, strategy, 1_u32);

            println!(
                "{}: best={}, states={}, time={:.6}s",
                strategy.as_str(),
                measurement.best,
                measurement.states,
                measurement.mean_time.as_secs_f64(),
            );
        });
    }

    fn bottom_up(&self) {
        self.with_board(|board, _, _| {
            let tabulation: Tabulation = solver::bottom_up(board);
            let path: String = tabulation
                .path
                .iter()
                .map(|pos| format!("({}, {})", pos.x, pos.y))
                .collect::<Vec<String>>()
                .join(" -> ");

            println!(
                "bottom-up: best={}, table entries={}, reachable={}\npath: {}",
                tabulation.best, tabulation.table_entries, tabulation.reachable, path,
            );
        });
    }

    fn sweep(&self) {
        let config: SweepConfig = SweepConfig {
            side_lens: self.sweep_sizes.clone(),
            instances: self.sweep_instances,
            bomb_prob: self.bomb_prob,
            radaway_prob: self.radaway_prob,
            seed: self.seed,
            repetitions: self.repetitions,
        };

        println!("sweeping sizes {:?}...", config.side_lens);
        println!("{}", render_sweep_report(&sweep(&config)));
    }

    fn load_board(&mut self) {
        let file_path: String = read_line("board file path: ");

        if let Some(board) = try_load_board(&file_path) {
            self.size = board.side_len();
            self.board = Some(board);
            println!("loaded a {0}x{0} board", self.size);
        }
    }
}

fn read_line(prompt: &str) -> String {
    print!("{prompt}");
    stdout().flush().unwrap();

    let mut line: String = String::new();

    if stdin().read_line(&mut line).is_err() {
        line.clear();
    }

    line.trim().to_owned()
}

fn read_probability(prompt: &str) -> Option<f64> {
    read_line(prompt)
        .parse::<f64>()
        .ok()
        .filter(|probability: &f64| (0.0_f64..=1.0_f64).contains(probability))
}

fn try_load_board(file_path: &str) -> Option<Board> {
    // SAFETY: This isn't truly safe, we're just hoping nobody touches our file before we're done
    // parsing it
    unsafe {
        open_utf8_file(file_path, |board_str: &str| {
            Board::try_from(board_str).map_or_else(
                |error: BoardError| {
                    eprintln!("failed to parse board file \"{file_path}\": {error:?}");

                    None
                },
                Some,
            )
        })
    }
    .unwrap_or_else(|error| {
        eprintln!("failed to open UTF-8 file \"{file_path}\": {error}");

        None
    })
}

fn main() {
    let args: Args = Args::parse();

    Menu::new(&args).run();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_size() {
        assert_eq!(sanitized_size(0_usize), 1_usize);
        assert_eq!(sanitized_size(7_usize), 7_usize);

        // A zero size from the command line must never reach the generator as-is.
        let mut rng: StdRng = StdRng::seed_from_u64(0_u64);
        let board: Board = Board::generate(sanitized_size(0_usize), 0.2_f64, 0.2_f64, &mut rng);

        assert_eq!(board.side_len(), 1_usize);
    }

    #[test]
    fn test_sanitized_probability() {
        assert_eq!(sanitized_probability(0.4_f64, 0.2_f64), 0.4_f64);
        assert_eq!(sanitized_probability(0.0_f64, 0.2_f64), 0.0_f64);
        assert_eq!(sanitized_probability(1.0_f64, 0.2_f64), 1.0_f64);
        assert_eq!(sanitized_probability(1.5_f64, 0.2_f64), 0.2_f64);
        assert_eq!(sanitized_probability(-0.1_f64, 0.2_f64), 0.2_f64);
        assert_eq!(sanitized_probability(f64::NAN, 0.2_f64), 0.2_f64);
    }
}
