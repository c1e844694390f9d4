use std::collections::BTreeMap;

use abduce::oracle::parse::parse_engine_log;
use abduce::oracle::regions::chunk_input_regions;
use abduce::oracle::script::{
    amend_print_model, build_script, normalize_directive, normalize_memory_line,
};

mod log_parsing {
    use super::*;

    const LOG: &str = "\
[sse:info] Exploring from 0x08048000
[sse:result] Model @ 080e3f10
0x080e3f4c : 00
0x080e3f4d : 00
eax_32 : {#x00000007; 32}
dummy_flag : {0; 8}
from_file!1 : 2a
[sse:info] Goal unreachable.
";

    #[test]
    fn models_and_markers() {
        let parse = parse_engine_log(LOG, &BTreeMap::new());

        assert!(parse.goal_unreachable);
        assert_eq!(parse.models.len(), 1);

        let model = &parse.models[0];
        assert_eq!(model.location, "080e3f10");
        assert_eq!(model.bindings.get("0x080e3f4c").map(String::as_str), Some("0x00"));
        assert_eq!(model.bindings.get("eax").map(String::as_str), Some("0x00000007"));
        // Engine-internal names are not recovered as register bindings.
        assert!(!model.bindings.keys().any(|k| k.starts_with("dummy")));
    }

    #[test]
    fn translation_renames_nondet_stands_ins() {
        let log = "\
[sse:result] Model @ 0400
dvar0 : 2a
";
        let mut translation = BTreeMap::new();
        translation.insert("dvar0".to_owned(), "0x080e3f4c:4".to_owned());
        let parse = parse_engine_log(log, &translation);

        let model = &parse.models[0];
        assert_eq!(
            model.bindings.get("0x080e3f4c:4").map(String::as_str),
            Some("0x2a")
        );
        assert!(!model.bindings.contains_key("dvar0"));
    }

    #[test]
    fn checkct_status_and_leaks() {
        let log = "\
[checkct:result] Instruction 0x0804890a has memory leak
[checkct:result] Instruction 0x08048912 has control flow leak
[checkct:info] Program status is: insecure
";
        let parse = parse_engine_log(log, &BTreeMap::new());

        assert_eq!(parse.ct_status.as_deref(), Some("insecure"));
        assert_eq!(parse.ct_leaks.len(), 2);
        assert_eq!(parse.ct_leaks[0].instruction, "0x0804890a");
        assert_eq!(parse.ct_leaks[0].kind, "memory");
        assert_eq!(parse.ct_leaks[1].kind, "control flow");
    }

    #[test]
    fn empty_log_parses_to_nothing() {
        let parse = parse_engine_log("", &BTreeMap::new());
        assert!(parse.models.is_empty());
        assert!(!parse.goal_unreachable);
        assert!(parse.ct_status.is_none());
    }
}

mod directives {
    use super::*;

    #[test]
    fn legacy_spellings_are_normalized() {
        assert_eq!(
            normalize_directive("0x0804890a reach"),
            Some("reach 0x0804890a".to_owned())
        );
        assert_eq!(
            normalize_directive("0x0804890a cut"),
            Some("cut at 0x0804890a".to_owned())
        );
        assert_eq!(
            normalize_directive("0x0804890a assume eax<32> = 0x00000001"),
            Some("at 0x0804890a assume eax<32> = 0x00000001".to_owned())
        );
    }

    #[test]
    fn modern_spellings_pass_through() {
        assert_eq!(
            normalize_directive("reach 0x400 then print model"),
            Some("reach 0x400 then print model".to_owned())
        );
        assert_eq!(normalize_directive("# goals"), None);
        assert_eq!(normalize_directive("   "), None);
    }

    #[test]
    fn reach_directives_gain_model_printing() {
        let amended = amend_print_model(vec![
            "reach 0x400".to_owned(),
            "reach 0x500 then print model".to_owned(),
            "cut at 0x600".to_owned(),
        ]);
        assert_eq!(amended[0], "reach 0x400 then print model");
        assert_eq!(amended[1], "reach 0x500 then print model");
        assert_eq!(amended[2], "cut at 0x600");
    }
}

mod memory {
    use super::*;

    #[test]
    fn legacy_load_lines_are_rewritten() {
        assert_eq!(
            normalize_memory_line("load @[0x080e4f4c,4] from file;"),
            Some("@[0x080e4f4c,4] := from_file".to_owned())
        );
        assert_eq!(
            normalize_memory_line("@[0x080e4f4c,4] := from_file"),
            Some("@[0x080e4f4c,4] := from_file".to_owned())
        );
        assert_eq!(normalize_memory_line("controlled 0x080e4f4c"), None);
        assert_eq!(normalize_memory_line(""), None);
    }

    #[test]
    fn script_composition_order() {
        let script = build_script(
            "starting from 0x08048000\n",
            &["@[0x080e4f4c,4] := from_file".to_owned()],
            &["reach 0x400 then print model".to_owned()],
        );
        assert_eq!(
            script,
            "starting from 0x08048000\n\
             @[0x080e4f4c,4] := from_file\n\
             reach 0x400 then print model\n"
        );
    }
}

mod regions {
    use super::*;

    #[test]
    fn regions_chunk_into_words_and_tails() {
        let chunks = chunk_input_regions(&[(0x1000, 10)], 32);
        assert_eq!(chunks, vec![(0x1000, 4), (0x1004, 4), (0x1008, 2)]);
    }

    #[test]
    fn regions_are_capped_and_deduplicated() {
        let chunks = chunk_input_regions(&[(0x1000, 64), (0x1000, 4)], 8);
        assert_eq!(chunks, vec![(0x1000, 4), (0x1004, 4)]);
    }
}
