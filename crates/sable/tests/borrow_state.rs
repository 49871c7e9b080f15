use sable::{BorrowState, Diagnostic, Location, PathManager};

#[test]
fn using_paths() {
    let mut pm = PathManager::new();
    let mut errors: Vec<Diagnostic> = Vec::new();
    let mut bs = BorrowState::new();
    let l = Location::new(1, 1, 0);

    let x = pm.get_root("x");
    let y = pm.get_root("y");
    bs.intro(x, l);
    bs.intro(y, l);
    assert!(bs.use_path(x, l, &pm, &mut errors), "use failed");
    assert!(!bs.use_path(x, l, &pm, &mut errors), "use should have failed");
    assert!(bs.use_path(y, l, &pm, &mut errors), "use failed 2");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message().contains("already used"));
}

#[test]
fn using_an_untracked_path_fails() {
    let mut pm = PathManager::new();
    let mut errors: Vec<Diagnostic> = Vec::new();
    let mut bs = BorrowState::new();
    let l = Location::new(1, 1, 0);

    let x = pm.get_root("x");
    assert!(!bs.use_path(x, l, &pm, &mut errors));
    assert!(errors[0].message().contains("created outside this scope"));
}

#[test]
fn moving_paths() {
    let mut pm = PathManager::new();
    let mut errors: Vec<Diagnostic> = Vec::new();
    let mut bs = BorrowState::new();
    let l = Location::new(1, 1, 0);

    let x = pm.get_root("x");
    assert!(bs.move_path(x, l, &pm, &mut errors), "move failed");
    assert!(!bs.move_path(x, l, &pm, &mut errors), "move should have failed");
    assert!(bs.unmove_path(x, l, &pm, &mut errors), "unmove failed");
    assert!(!bs.unmove_path(x, l, &pm, &mut errors), "unmove should have failed");
    assert!(bs.move_path(x, l, &pm, &mut errors), "move failed 2");
}

#[test]
fn moving_an_unused_path_in_its_own_scope_fails() {
    let mut pm = PathManager::new();
    let mut errors: Vec<Diagnostic> = Vec::new();
    let mut bs = BorrowState::new();
    let l = Location::new(1, 1, 0);

    let x = pm.get_root("x");
    bs.intro(x, l);
    assert!(!bs.move_path(x, l, &pm, &mut errors));
    assert!(errors[0].message().contains("cannot be moved in the same scope"));
}

/// A path consumed in only one of two branches is flagged when the
/// branches merge.
#[test]
fn merge_flags_one_sided_use() {
    let mut pm = PathManager::new();
    let mut errors: Vec<Diagnostic> = Vec::new();
    let l = Location::new(1, 1, 0);

    let x = pm.get_root("x");
    let mut previous = BorrowState::new();
    previous.intro(x, l);

    let mut then_state = previous.clone();
    assert!(then_state.use_path(x, l, &pm, &mut errors));
    let else_state = previous.clone();

    then_state.merge(&else_state, l, &previous, &pm, &mut errors);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message().contains("not used in both branches"));
}

/// Both branches making the same change is consistent.
#[test]
fn merge_accepts_agreeing_branches() {
    let mut pm = PathManager::new();
    let mut errors: Vec<Diagnostic> = Vec::new();
    let l = Location::new(1, 1, 0);

    let x = pm.get_root("x");
    let mut previous = BorrowState::new();
    previous.intro(x, l);

    let mut then_state = previous.clone();
    assert!(then_state.use_path(x, l, &pm, &mut errors));
    let mut else_state = previous.clone();
    assert!(else_state.use_path(x, l, &pm, &mut errors));

    then_state.merge(&else_state, l, &previous, &pm, &mut errors);
    assert!(errors.is_empty());
}

/// A moved path restored in only one branch is flagged.
#[test]
fn merge_flags_one_sided_restore() {
    let mut pm = PathManager::new();
    let mut errors: Vec<Diagnostic> = Vec::new();
    let l = Location::new(1, 1, 0);

    let x = pm.get_root("x");
    let mut previous = BorrowState::new();
    assert!(previous.move_path(x, l, &pm, &mut errors));

    let mut then_state = previous.clone();
    assert!(then_state.unmove_path(x, l, &pm, &mut errors));
    let else_state = previous.clone();

    then_state.merge(&else_state, l, &previous, &pm, &mut errors);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message().contains("not replaced by both branches"));
}
