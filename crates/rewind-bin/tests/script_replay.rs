use core_config::Config;
use pretty_assertions::assert_eq;
use rewind::{ScriptRunner, parse_script};

fn fast_config() -> Config {
    let mut cfg = Config::default();
    cfg.file.capture.debounce_ms = 20;
    cfg
}

async fn replay(src: &str) -> Vec<String> {
    let commands = parse_script(src).unwrap();
    ScriptRunner::new(&fast_config()).run(&commands).await
}

#[tokio::test]
async fn explicit_captures_walk_back_and_forth() {
    let out = replay(
        "type a\ncapture\ntype b\ncapture\ntype c\ncapture\n\
         undo\nundo\nredo\nredo\nredo\nshow\n",
    )
    .await;
    assert_eq!(
        out,
        vec![
            "undo: \"ab\" caret=2",
            "undo: \"a\" caret=1",
            "redo: \"ab\" caret=2",
            "redo: \"abc\" caret=3",
            "redo: skipped (EmptyStack)",
            "[rich] \"abc\" caret=3 undo=on redo=off",
        ]
    );
}

#[tokio::test]
async fn typing_burst_becomes_one_step() {
    let out = replay("type hello\nwait 200\ntype  world\nundo\nshow\n").await;
    // The pending " world" burst is flushed before stepping back.
    assert_eq!(out[0], "undo: \"hello\" caret=5");
    assert_eq!(out[1], "[rich] \"hello\" caret=5 undo=on redo=on");
}

#[tokio::test]
async fn caret_survives_undo_mid_text() {
    let out = replay("type ab\ncapture\ncaret 1\ntype X\ncapture\nundo\nshow\n").await;
    assert_eq!(out[0], "undo: \"ab\" caret=1");
    assert_eq!(out[1], "[rich] \"ab\" caret=1 undo=on redo=on");
}

#[tokio::test]
async fn read_only_and_clear() {
    let out = replay(
        "type x\ncapture\nreadonly on\nundo\nreadonly off\nclear\nundo\nshow\n",
    )
    .await;
    assert_eq!(
        out,
        vec![
            "undo: skipped (ReadOnlySurface)",
            "undo: skipped (EmptyStack)",
            "[rich] \"\" caret=0 undo=off redo=off",
        ]
    );
}

#[tokio::test]
async fn modes_do_not_share_history() {
    let out = replay("type one\ncapture\nmode source_split\nundo\nmode rich\nundo\n").await;
    assert_eq!(
        out,
        vec!["undo: skipped (EmptyStack)", "undo: \"\" caret=0"]
    );
}
