/*!
A simple CLI interface to the library.

# Use

```sh
paravet_cli <scenario> <k_max_clause> <d_max_rank>
```

The scenario is one of the bundled benchmarks (`find_last`, `resource_manager`, `cve_2014_7841`, `build_lists`, `null_rc`).
The two bounds limit clause size and clause rank; `-1` means unbounded.

Exit status is 0 when the scenario's property is proved, 1 on a proof failure, and 2 on any other error.
*/

use clap::Parser;

use paravet::{
    config::{Bound, Config},
    scenarios::Scenario,
    types::err::ErrorKind,
};

#[derive(Parser)]
#[command(name = "paravet_cli", about = "Verify a bundled benchmark scenario.")]
struct Cli {
    /// The scenario to analyse.
    scenario: String,

    /// The maximum clause size; -1 for unbounded.
    #[arg(allow_negative_numbers = true)]
    k_max_clause: i64,

    /// The maximum clause rank; -1 for unbounded.
    #[arg(allow_negative_numbers = true)]
    d_max_rank: i64,
}

fn main() {
    let cli = Cli::parse();

    let Some(scenario) = Scenario::from_name(&cli.scenario) else {
        eprintln!("unknown scenario: {}", cli.scenario);
        eprintln!(
            "available: {}",
            Scenario::all()
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        std::process::exit(2);
    };

    let config = Config {
        max_clause_size: Bound::from_cli(cli.k_max_clause),
        max_clause_rank: Bound::from_cli(cli.d_max_rank),
        ..Config::default()
    };

    let started = std::time::Instant::now();
    let outcome = scenario.run(config);
    let elapsed = started.elapsed();

    match outcome {
        Ok(()) => {
            println!("{}: proved ({elapsed:.2?})", scenario.name());
        }
        Err(ErrorKind::Proof(e)) => {
            println!("{}: proof failed ({elapsed:.2?})", scenario.name());
            eprintln!("{}", ErrorKind::Proof(e));
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{}: error: {e}", scenario.name());
            std::process::exit(2);
        }
    }
}
