use std::{cell::RefCell, io, rc::Rc, sync::LazyLock};

use kigroup::{
    Group, config,
    control::{self, NameFilter},
    diag, group,
    harness::{self, TapHarness},
    ok,
    plugin::{self, next_group_plugin},
    todo,
};
use pretty_assertions::assert_eq;
use regex::Regex;

/// TAP target shared between the installed harness and the test.
#[derive(Default, Clone)]
struct Tape(Rc<RefCell<Vec<u8>>>);

impl io::Write for Tape {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Tape {
    fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

static LOCATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"at \S+ line \d+\.").unwrap());

/// Run `script` against a TAP harness and return its output with locations blanked out.
fn tap_output(script: impl FnOnce()) -> String {
    let tape = Tape::default();
    harness::set_harness(TapHarness::default().with_target(tape.clone()));
    script();
    harness::done_testing();
    let output = tape.text();
    LOCATION.replace_all(&output, "at FILE line N.").into_owned()
}

fn pass() {
    ok(true, "fine");
}

fn no_database() {
    panic!("no database")
}

#[test]
fn mixed_groups() {
    let actual = tap_output(|| {
        group("passes", || {
            ok(true, "one");
            ok(true, "two");
        });
        group("fails", || {
            ok(true, "one");
            ok(false, "two");
        });
        group("excused", || {
            ok(true, "one");
            todo::scope("not yet", || {
                ok(false, "two");
            });
        });
        group("surprise", || {
            todo::scope("", || {
                ok(true, "fixed");
            });
        });
        control::skip_next(1, Some("slow")).unwrap();
        group("skipped", pass);
        group("outer", || {
            ok(true, "one");
            group("inner", || {
                ok(false, "deep");
            });
        });
        group("dies", || {
            ok(true, "one");
            no_database();
        });
        group("known issue TODO", || {
            ok(false, "broken");
        });
    });

    let expected = "\
ok 1 - passes
#   Failed test 'two'
#   at FILE line N.
not ok 2 - fails
#   Failed test 'fails'
#   at FILE line N.
#   Failed (TODO) test 'two'
#   at FILE line N.
not ok 3 - excused # TODO not yet
#   Failed (TODO) test 'excused'
#   at FILE line N.
ok 4 - surprise # TODO no explanation given
ok 5 # skip slow
#   Failed test 'deep'
#   at FILE line N.
#   Failed test 'inner'
#   at FILE line N.
not ok 6 - outer
#   Failed test 'outer'
#   at FILE line N.
# Test dies died:
# no database at FILE line N.
not ok 7 - *died* dies
#   Failed test '*died* dies'
#   at FILE line N.
#   Failed test 'broken'
#   at FILE line N.
not ok 8 - known issue TODO # TODO known issue TODO
#   Failed (TODO) test 'known issue TODO'
#   at FILE line N.
1..8
";
    assert_eq!(actual, expected);
}

#[test]
fn todo_around_group_excuses_verdict() {
    let actual = tap_output(|| {
        todo::scope("flaky backend", || {
            group("backend", || {
                ok(false, "reachable");
            });
        });
        ok(true, "after");
    });

    let expected = "\
#   Failed test 'reachable'
#   at FILE line N.
not ok 1 - backend # TODO flaky backend
#   Failed (TODO) test 'backend'
#   at FILE line N.
ok 2 - after
1..2
";
    assert_eq!(actual, expected);
}

#[test]
fn filters_and_plugins() {
    let actual = tap_output(|| {
        control::set_name_filter(Regex::new("^net_").unwrap(), Some("offline"));
        group("net_dns", pass);
        group("disk_io", pass);
        control::set_name_filter(NameFilter::Any, None);

        next_group_plugin(plugin::around(
            || diag("setting up"),
            || diag("tearing down"),
        ));
        group("fixture", pass);

        control::skip_indefinitely(None).unwrap();
        group("later 1", pass);
        group("later 2", pass);
        control::cancel_indefinite_skip();
        group("again", pass);
    });

    let expected = "\
ok 1 - net_dns
ok 2 # skip offline
# setting up
# tearing down
ok 3 - fixture
ok 4 # skip
ok 5 # skip
ok 6 - again
1..6
";
    assert_eq!(actual, expected);
}

#[test]
fn verbose_and_muted_groups() {
    let actual = tap_output(|| {
        config::set_verbosity(2);
        group("chatty", pass);
        config::set_verbosity(0);

        let outcome = Group::new("silent", || {
            diag("never shown");
            ok(false, "hidden");
        })
        .muted(true)
        .run();
        assert_eq!(outcome.subtests().len(), 1);
        outcome.report();
    });

    let expected = "\
# Running group of tests - chatty
# Finished group of tests - chatty: 1 subtests, 0 failed
ok 1 - chatty
not ok 2 - silent
#   Failed test 'silent'
#   at FILE line N.
1..2
";
    assert_eq!(actual, expected);
}

#[test]
fn exceptions_in_logfile() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("died.log");

    let actual = tap_output(|| {
        config::set_logfile(&path).unwrap();
        group("dies", no_database);
        config::clear_logfile();
    });

    let notice = format!("# Test dies died, see {}\n", path.display());
    assert!(actual.starts_with(&notice), "{actual}");
    assert!(actual.contains("not ok 1 - *died* dies\n"));

    let logged = std::fs::read_to_string(&path).unwrap();
    let logged = LOCATION.replace_all(&logged, "at FILE line N.");
    assert_eq!(logged, "Test dies died:\nno database at FILE line N.\n");
}
