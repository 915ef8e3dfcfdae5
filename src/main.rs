use feynman::prelude::*;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Engine {
    Enumerate,
    Recurrence,
    Parallel,
    All,
}

fn main() {
    let mut cfg = FeynmanConfig::default();
    let mut engine = Engine::Recurrence;
    let mut from: Option<usize> = None;
    let mut to: Option<usize> = None;
    let mut partition: Option<String> = None;
    let mut breakdown = false;
    let mut validate_only = false;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--test" | "--validate" => {
                validate_only = true;
                i += 1;
            }
            "--n" => {
                let v = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
                from = Some(v.parse().unwrap_or_else(|_| usage_and_exit(2)));
                i += 2;
            }
            "--to" => {
                let v = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
                to = Some(v.parse().unwrap_or_else(|_| usage_and_exit(2)));
                i += 2;
            }
            "--modulus" => {
                let v = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
                cfg.modulus = Modulus::from_raw(v.parse().unwrap_or_else(|_| usage_and_exit(2)));
                i += 2;
            }
            "--engine" => {
                let v = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
                engine = match v.as_str() {
                    "enumerate" => Engine::Enumerate,
                    "recurrence" => Engine::Recurrence,
                    "parallel" => Engine::Parallel,
                    "all" => Engine::All,
                    _ => usage_and_exit(2),
                };
                i += 2;
            }
            "--partition" => {
                let v = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
                partition = Some(v.clone());
                i += 2;
            }
            "--workers" => {
                let v = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
                cfg.workers = Some(v.parse().unwrap_or_else(|_| usage_and_exit(2)));
                i += 2;
            }
            "--breakdown" => {
                breakdown = true;
                i += 1;
            }
            "--dump" => {
                cfg.dump_progress = true;
                i += 1;
            }
            "--help" | "-h" => usage_and_exit(0),
            _ => usage_and_exit(2),
        }
    }

    if validate_only {
        let checked = validate_known_values().and_then(|()| cross_validate(0, 14, cfg.modulus));
        match checked {
            Ok(()) => {
                println!("Validation OK: known values hold and all engines agree for n <= 14.");
                return;
            }
            Err(e) => {
                eprintln!("Validation FAILED: {e}");
                std::process::exit(1);
            }
        }
    }

    if let Some(text) = partition {
        match count_completions_str(&text, cfg.modulus) {
            Ok(count) => println!("{text}: {count} ({})", cfg.modulus),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(2);
            }
        }
        return;
    }

    let lo = from.unwrap_or_else(|| usage_and_exit(2));
    let hi = to.unwrap_or(lo);

    if breakdown {
        let acc = FeynmanAccumulator::new(cfg.clone());
        for n in (lo..=hi).filter(|n| n % 2 == 0) {
            print_breakdown(&acc, n);
        }
        return;
    }

    let enumerator = FeynmanAccumulator::new(cfg.clone());
    let sequential = RecurrenceEngine::sequential(cfg.clone());
    let parallel = matches!(engine, Engine::Parallel | Engine::All)
        .then(|| RecurrenceEngine::parallel(cfg.clone()));

    for n in lo..=hi {
        match engine {
            Engine::Enumerate => match enumerator.try_compute(n) {
                Ok(f) => println!("F({n}) = {f}"),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(2);
                }
            },
            Engine::Recurrence => println!("F({n}) = {}", sequential.compute(n)),
            Engine::Parallel | Engine::All => {
                let f = parallel
                    .as_ref()
                    .map_or_else(|| sequential.compute(n), |par| par.compute(n));
                if engine == Engine::All {
                    let seq = sequential.compute(n);
                    let by_enum = enumerator.try_compute(n).ok();
                    let agree = seq == f && by_enum.as_ref().map_or(true, |e| *e == f);
                    let by_enum = by_enum.map_or_else(|| "-".to_string(), |e| e.to_string());
                    println!(
                        "F({n}) = {f} | sequential={seq} | enumerate={by_enum} | {}",
                        if agree { "agree" } else { "MISMATCH" }
                    );
                    if !agree {
                        std::process::exit(1);
                    }
                } else {
                    println!("F({n}) = {f}");
                }
            }
        }
    }
}

fn print_breakdown(acc: &FeynmanAccumulator, n: usize) {
    let rows = acc.breakdown(n);
    println!("n={n}: {} partitions ({})", rows.len(), acc.config().modulus);
    for row in &rows {
        println!("  {} -> {}", row.vector, row.count);
    }
    for (count, vectors) in group_by_count(&rows) {
        let names: Vec<String> = vectors.iter().map(ToString::to_string).collect();
        println!("  count {count}: {}", names.join(" "));
    }
}

fn usage_and_exit(code: i32) -> ! {
    eprintln!(
        "Usage:\n  feynman --n N [--to M] [--engine enumerate|recurrence|parallel|all] [--modulus M] [--workers W] [--dump]\n  feynman --n N [--to M] --breakdown\n  feynman --partition \"[7 0,1]\" [--modulus M]\n  feynman --test\n\nOptions:\n  --n N                    Size to compute (or the start of a range with --to)\n  --to M                   Last size of the range (inclusive)\n  --engine E               enumerate | recurrence (default) | parallel | all (cross-check)\n  --modulus M              Modulus for every accumulation (default: 1000000007; 0 or 1 = exact)\n  --workers W              Worker threads for the parallel recurrence (default: auto-detect)\n  --partition P            Count connected completions of one blue vector\n  --breakdown              Per-partition counts and their grouping\n  --dump                   Print progress diagnostics\n  --test/--validate        Known values and engine cross-check (fast, deterministic)\n"
    );
    std::process::exit(code)
}
