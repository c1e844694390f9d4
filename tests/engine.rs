//! End-to-end exercises of the engine-backed adapter over a scripted stand-in engine.
//!
//! The stand-in is a shell script selected through the `BINSEC` environment variable,
//! so every phase runs inside the one test function.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use abduce::config::Config;
use abduce::oracle::{BinsecOracle, CtStatus, ReachStatus, ReachabilityOracle};
use abduce::structures::term::TermArena;

fn write_executable(path: &Path, content: &str) {
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    drop(file);
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn engine_config(dir: &Path) -> Config {
    let base = dir.join("base.script");
    std::fs::write(&base, "starting from 0x08048000\nreach 0x999\n").unwrap();
    let memory = dir.join("memory.script");
    std::fs::write(&memory, "@[0x080e3f4c,4] := from_file\n").unwrap();

    let mut config = Config::default();
    config.engine_config = base;
    config.engine_memory = memory;
    config.engine_binary = PathBuf::from(dir.join("missing.bin"));
    config.anchor = "0x08049000".to_owned();
    config.config_logdir = dir.join("logs");
    config
}

#[test]
fn fake_engine_driven_adapter() {
    let dir = tempfile::tempdir().unwrap();
    let arena = TermArena::default();

    // Phase 1: an unknown constant-time verdict is retried and the retry decides.
    let counter = dir.path().join("count");
    let flaky = dir.path().join("flaky-engine.sh");
    write_executable(
        &flaky,
        &format!(
            "#!/bin/sh\n\
             n=$(cat {count} 2>/dev/null || echo 0)\n\
             echo $((n + 1)) > {count}\n\
             if [ \"$n\" -eq 0 ]; then\n\
               echo '[checkct:info] Program status is: unknown'\n\
             else\n\
               echo '[checkct:info] Program status is: secure'\n\
             fi\n",
            count = counter.display(),
        ),
    );
    std::env::set_var("BINSEC", &flaky);

    let mut config = engine_config(dir.path());
    config.ct_unknown_retries = 1;
    let mut oracle = BinsecOracle::from_config(&config).unwrap();
    let outcome = oracle.ct_evaluate(&arena, &[]).unwrap();
    assert_eq!(outcome.status, CtStatus::Secure);
    assert_eq!(oracle.ct_history.len(), 2);
    assert_eq!(oracle.ct_history[0].status, CtStatus::Unknown);
    assert_eq!(oracle.ct_history[1].status, CtStatus::Secure);

    // Phase 2: without retries the unknown verdict stands and the loop proceeds.
    std::fs::write(&counter, "0\n").unwrap();
    config.ct_unknown_retries = 0;
    let mut oracle = BinsecOracle::from_config(&config).unwrap();
    let outcome = oracle.ct_evaluate(&arena, &[]).unwrap();
    assert_eq!(outcome.status, CtStatus::Unknown);
    assert_eq!(oracle.ct_history.len(), 1);

    // Phase 3: model blocks are normalized and byte bindings aggregate into the
    // registered word.
    let modeler = dir.path().join("model-engine.sh");
    write_executable(
        &modeler,
        "#!/bin/sh\n\
         echo '[sse:info] Exploring'\n\
         echo '[sse:result] Model @ 080e3f10'\n\
         echo '0x080e3f4c : 2a'\n\
         echo '0x080e3f4d : 00'\n\
         echo '0x080e3f4e : 00'\n\
         echo '0x080e3f4f : 00'\n",
    );
    std::env::set_var("BINSEC", &modeler);

    let mut word_arena = TermArena::default();
    word_arena.declare_var("0x080e3f4c:4").unwrap();
    let mut oracle = BinsecOracle::from_config(&config).unwrap();
    let outcome = oracle.reach_negative(&word_arena, &[]).unwrap();
    assert_eq!(outcome.status, ReachStatus::Reachable);
    let model = outcome.model.unwrap();
    assert_eq!(model.value_of("0x080e3f4c:4"), Some("0x0000002a"));
    assert_eq!(model.value_of("0x080e3f4c"), Some("0x2a"));
    let stats = oracle.statistics();
    assert_eq!(stats.get("engine").map(|c| c.calls), Some(1));
    assert_eq!(stats.get("engine").map(|c| c.times.len()), Some(1));

    // Phase 4: the goal-unreachable marker decides against reachability.
    let blocker = dir.path().join("blocking-engine.sh");
    write_executable(
        &blocker,
        "#!/bin/sh\n\
         echo '[sse:info] Goal unreachable.'\n",
    );
    std::env::set_var("BINSEC", &blocker);
    let mut oracle = BinsecOracle::from_config(&config).unwrap();
    let outcome = oracle.reach_negative(&word_arena, &[]).unwrap();
    assert_eq!(outcome.status, ReachStatus::Unreachable);

    // Phase 5: a timeout downgrades the verdict to unknown and is counted.
    let sleeper = dir.path().join("sleeping-engine.sh");
    write_executable(
        &sleeper,
        "#!/bin/sh\n\
         exec sleep 5\n",
    );
    std::env::set_var("BINSEC", &sleeper);
    config.engine_timeout = Some(1);
    let mut oracle = BinsecOracle::from_config(&config).unwrap();
    let outcome = oracle.reach_negative(&word_arena, &[]).unwrap();
    assert_eq!(outcome.status, ReachStatus::Unknown);
    let stats = oracle.statistics();
    assert_eq!(stats.get("engine").map(|c| c.timeouts), Some(1));

    // Phase 6: transient scripts are deleted after each query by default.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("logs"))
        .unwrap()
        .filter_map(Result::ok)
        .collect();
    assert!(leftovers.is_empty(), "transient scripts were retained");
}
