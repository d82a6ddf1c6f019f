mod common;

use common::*;
use seqrec_core::{Contrast, Error, Key, Side};
use seqrec_experiment::ResponseMode;
use std::collections::HashSet;
use std::time::Duration;

fn kupo() -> Contrast {
    Contrast::new("kupo", "kuvo")
}

#[test]
fn kupo_kuvo_session_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    populate(root.path(), &kupo());
    let script = contrast_script(2, vec![Step::Echo; 5]);
    let mut session = orchestrator(config(vec![kupo()]), &["AB", "ABA"], root.path(), script, 1);
    let mut sink = Sink::default();

    let result = session.run("p01", &mut sink).unwrap();

    assert_eq!(sink.appended.len(), 1);
    assert_eq!(sink.appended[0].0, "p01");
    assert_eq!(sink.appended[0].1, result);

    let contrast = &result.contrasts[0];
    assert_eq!(contrast.familiarization_plays, 1);
    assert_eq!(contrast.staircase_trials, 2);
    assert_eq!(contrast.levels.keys().copied().collect::<Vec<_>>(), vec![2, 3]);
    assert_eq!(contrast.levels[&2].len(), 1);
    assert_eq!(contrast.levels[&3].len(), 1);

    let stimuli: Vec<&str> = contrast
        .levels
        .values()
        .flatten()
        .flat_map(|t| t.responses.iter().map(|r| r.stimulus.as_str()))
        .collect();
    assert_eq!(
        stimuli,
        vec![
            "kupo_A/kupo_erica_1_A.wav",
            "kuvo_B/kuvo_erica_1_B.wav",
            "kupo_A/kupo_josh_1_A.wav",
            "kuvo_B/kuvo_josh_1_B.wav",
            "kupo_A/kupo_erica_2_A.wav",
        ]
    );
    let level3 = &contrast.levels[&3][0];
    assert_eq!(level3.template, "ABA");
    let keys: Vec<_> = level3.responses.iter().map(|r| r.key.clone()).collect();
    assert_eq!(
        keys,
        vec![Some(Key::new("a")), Some(Key::new("b")), Some(Key::new("a"))]
    );
    assert!(level3.responses.iter().all(|r| r.reaction_time_ns == Some(300_000_000)));

    // one marker per trial plus a seven-note chime per level
    assert_eq!(session.player.tones.len(), 2 + 2 * 7);
    assert_eq!(session.display.feedback, vec![true, true]);
    assert!(session.input.script.is_empty());
}

#[test]
fn control_contrast_always_runs_first() {
    for seed in 0..6 {
        let root = tempfile::tempdir().unwrap();
        let contrasts = vec![
            Contrast::new("lipa", "liba"),
            Contrast::new("semu", "zemu"),
            kupo().control(),
        ];
        for c in &contrasts {
            populate(root.path(), c);
        }
        let mut config = config(contrasts);
        config.recall_levels = vec![2];
        let script: Vec<Step> = (0..3)
            .flat_map(|_| contrast_script(2, vec![Step::Echo; 2]))
            .collect();
        let mut session = orchestrator(config, &["AB"], root.path(), script, seed);
        let result = session.run("p02", &mut Sink::default()).unwrap();

        assert_eq!(result.contrasts.len(), 3);
        assert!(result.contrasts[0].contrast.control, "seed {seed}");
        assert!(result.contrasts[1..].iter().all(|c| !c.contrast.control));
    }
}

#[test]
fn remaining_contrasts_are_shuffled() {
    let root = tempfile::tempdir().unwrap();
    let contrasts = vec![
        kupo().control(),
        Contrast::new("lipa", "liba"),
        Contrast::new("semu", "zemu"),
        Contrast::new("tano", "dano"),
        Contrast::new("fira", "vira"),
    ];
    let mut orders = HashSet::new();
    for seed in 0..20 {
        let mut session = orchestrator(config(contrasts.clone()), &["AB"], root.path(), vec![], seed);
        let order = session.contrast_order();
        assert_eq!(order.len(), contrasts.len());
        assert_eq!(order[0], contrasts[0]);
        orders.insert(order.iter().map(|c| c.a.clone()).collect::<Vec<_>>());
    }
    assert!(orders.len() > 1);
}

#[test]
fn missing_pool_aborts_before_anything_is_played() {
    let root = tempfile::tempdir().unwrap();
    populate(root.path(), &kupo());
    std::fs::remove_dir_all(root.path().join("kuvo_B")).unwrap();
    let mut session = orchestrator(
        config(vec![kupo()]),
        &["AB"],
        root.path(),
        contrast_script(2, vec![Step::Echo; 2]),
        3,
    );
    let mut sink = Sink::default();

    let err = session.run("p03", &mut sink).unwrap_err();

    assert!(matches!(err, Error::PoolNotFound { .. }));
    assert!(sink.appended.is_empty());
    assert!(session.player.played.is_empty());
    let (diagnostic, _) = session.display.prompts.last().unwrap();
    assert!(diagnostic.contains("kuvo_B"));
    assert!(diagnostic.starts_with("The stimulus folders are not ready"));
}

#[test]
fn empty_side_folder_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    populate(root.path(), &kupo());
    for entry in std::fs::read_dir(root.path().join("kuvo_B")).unwrap() {
        std::fs::remove_file(entry.unwrap().path()).unwrap();
    }
    let mut session = orchestrator(config(vec![kupo()]), &["AB"], root.path(), vec![], 3);
    let mut sink = Sink::default();

    let err = session.run("p04", &mut sink).unwrap_err();
    assert!(matches!(err, Error::EmptyPool { .. }));
    assert!(sink.appended.is_empty());
    assert!(session.display.prompts.last().unwrap().0.contains("kuvo_B"));
}

#[test]
fn silent_participant_still_yields_every_record() {
    let root = tempfile::tempdir().unwrap();
    populate(root.path(), &kupo());
    let mut config = config(vec![kupo()]);
    config.recall_levels = vec![2, 3];
    let script = contrast_script(2, vec![Step::Silent; 5]);
    let mut session = orchestrator(config, &["BA", "BAB"], root.path(), script, 4);
    let mut sink = Sink::default();

    let result = session.run("p05", &mut sink).unwrap();
    for (level, trials) in &result.contrasts[0].levels {
        assert_eq!(trials[0].responses.len(), *level);
        assert!(trials[0].responses.iter().all(|r| !r.responded && r.key.is_none()));
    }
    assert_eq!(sink.appended.len(), 1);
}

#[test]
fn unbounded_windows_wait_for_slow_answers() {
    let root = tempfile::tempdir().unwrap();
    populate(root.path(), &kupo());
    let mut config = config(vec![kupo()]);
    config.wait_indefinitely = true;
    config.recall_levels = vec![2];
    let hour = Duration::from_secs(3600);
    let script = contrast_script(2, vec![Step::Press("a", hour), Step::Press("b", hour)]);
    let mut session = orchestrator(config, &["AB"], root.path(), script, 5);

    let result = session.run("p06", &mut Sink::default()).unwrap();
    let trial = &result.contrasts[0].levels[&2][0];
    assert!(trial.responses.iter().all(|r| r.responded));
    assert_eq!(trial.responses[1].reaction_time_ns, Some(hour.as_nanos() as u64));
}

#[test]
fn advance_is_held_until_forced_listens_are_done() {
    let root = tempfile::tempdir().unwrap();
    populate(root.path(), &kupo());
    let mut config = config(vec![kupo()]);
    config.forced_listen_count = 2;
    config.recall_levels = vec![2];
    let mut script = vec![
        press("space"),
        press("a"),
        press("space"),
        press("b"),
        press("space"),
    ];
    script.extend(
        [press("space"), Step::Echo, Step::Echo, press("space"), Step::Echo, Step::Echo],
    );
    let mut session = orchestrator(config, &["AB"], root.path(), script, 6);

    let result = session.run("p07", &mut Sink::default()).unwrap();
    assert_eq!(result.contrasts[0].familiarization_plays, 2);
    assert_eq!(session.display.cues, vec![Side::A, Side::B]);
    assert!(session.player.played[0].starts_with("kupo_A/"));
    assert!(session.player.played[1].starts_with("kuvo_B/"));
}

#[test]
fn unmapped_staircase_key_resets_the_streak() {
    let root = tempfile::tempdir().unwrap();
    populate(root.path(), &kupo());
    let mut config = config(vec![kupo()]);
    config.recall_levels = vec![2];
    let script = vec![
        press("a"),
        press("space"),
        press("space"),
        Step::Echo,
        press("x"),
        Step::Echo,
        Step::Echo,
        press("space"),
        Step::Echo,
        Step::Echo,
    ];
    let mut session = orchestrator(config, &["AB"], root.path(), script, 7);

    let result = session.run("p08", &mut Sink::default()).unwrap();
    assert_eq!(result.contrasts[0].staircase_trials, 4);
    assert_eq!(session.display.feedback, vec![true, false, true, true]);
    assert_eq!(session.display.progress.last(), Some(&1.0));
}

#[test]
fn after_sequence_mode_collects_once_playback_is_over() {
    let root = tempfile::tempdir().unwrap();
    populate(root.path(), &kupo());
    let mut config = config(vec![kupo()]);
    config.response_mode = ResponseMode::AfterSequence;
    config.recall_levels = vec![3];
    let script = contrast_script(2, vec![Step::Echo; 3]);
    let mut session = orchestrator(config, &["ABB"], root.path(), script, 8);

    let result = session.run("p09", &mut Sink::default()).unwrap();
    let trial = &result.contrasts[0].levels[&3][0];
    assert_eq!(trial.responses.len(), 3);
    // every window opens after the last item, so the most recent side heard is B
    assert!(trial.responses.iter().all(|r| r.key == Some(Key::new("b"))));
}

#[test]
fn levels_without_sequences_are_skipped() {
    let root = tempfile::tempdir().unwrap();
    populate(root.path(), &kupo());
    let mut config = config(vec![kupo()]);
    config.recall_levels = vec![2, 5];
    let script = contrast_script(2, vec![Step::Echo; 2]);
    let mut session = orchestrator(config, &["AB", "ABAB"], root.path(), script, 9);

    let result = session.run("p10", &mut Sink::default()).unwrap();
    assert_eq!(
        result.contrasts[0].levels.keys().copied().collect::<Vec<_>>(),
        vec![2]
    );
    // one chime for the single level that ran
    assert_eq!(session.player.tones.len(), 1 + 7);
}

#[test]
fn failing_sink_aborts_with_a_diagnostic() {
    let root = tempfile::tempdir().unwrap();
    populate(root.path(), &kupo());
    let mut config = config(vec![kupo()]);
    config.recall_levels = vec![2];
    let script = contrast_script(2, vec![Step::Echo; 2]);
    let mut session = orchestrator(config, &["AB"], root.path(), script, 10);
    let mut sink = Sink {
        fail: true,
        ..Sink::default()
    };

    let err = session.run("p11", &mut sink).unwrap_err();
    assert!(matches!(err, Error::Results(_)));
    let (diagnostic, _) = session.display.prompts.last().unwrap();
    assert!(diagnostic.contains("disk full"));
    assert!(diagnostic.starts_with("The experiment cannot continue"));
}

#[test]
fn sequences_within_a_level_are_shuffled() {
    let root = tempfile::tempdir().unwrap();
    populate(root.path(), &kupo());
    let templates = ["AB", "BA", "AA", "BB"];

    let mut orders = HashSet::new();
    for seed in 0..12 {
        let mut config = config(vec![kupo()]);
        config.recall_levels = vec![2];
        let script = contrast_script(2, vec![Step::Echo; 2 * templates.len()]);
        let mut session = orchestrator(config, &templates, root.path(), script, seed);

        let result = session.run("p12", &mut Sink::default()).unwrap();
        let played: Vec<String> = result.contrasts[0].levels[&2]
            .iter()
            .map(|t| t.template.clone())
            .collect();

        let mut sorted = played.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["AA", "AB", "BA", "BB"], "seed {seed}");
        orders.insert(played);
    }
    assert!(orders.len() > 1, "every seed played the same order");
}
