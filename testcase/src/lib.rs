// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The scenario-test registry: outcome model, inventory of test cases, and
//! name-based filtering, plus the skip plumbing used by `oswin_skip!`.

pub use anyhow::{Context, Result};
pub use futures::future::BoxFuture;
pub use inventory::submit as inventory_submit;
pub use oswin_framework;
pub use oswin_testcase_macros::*;
use thiserror::Error;

pub use oswin_framework::Framework;

#[derive(Debug, Error)]
pub enum TestSkippedError {
    #[error("Test skipped: {0:?}")]
    TestSkipped(Option<String>),
}

/// The outcome from executing a specific test case.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TestOutcome {
    /// The test passed.
    Passed,

    /// The test failed.
    Failed(Option<String>),

    /// The test chose to be skipped, i.e. it detected a parameter or
    /// condition that makes it impossible to execute the test or to
    /// meaningfully provide a pass/fail outcome. The payload is an optional
    /// message.
    Skipped(Option<String>),
}

/// A wrapper for test functions. This is needed to allow [`TestCase`] to
/// have a `const` constructor for the inventory crate.
pub struct TestFunction {
    pub f: fn(&Framework) -> BoxFuture<'_, TestOutcome>,
}

/// A description of a single test case.
pub struct TestCase {
    /// The path to the module containing the test case. This is generally
    /// derived from the `module_path!()` macro, which the
    /// `#[oswin_testcase]` attribute macro uses when constructing the test
    /// case's inventory entry.
    module_path: &'static str,

    /// The name of this test case, which is generally its function name.
    name: &'static str,

    /// The test function to execute to run this test.
    function: TestFunction,
}

impl TestCase {
    /// Constructs a new [`TestCase`].
    pub const fn new(
        module_path: &'static str,
        name: &'static str,
        function: TestFunction,
    ) -> Self {
        Self { module_path, name, function }
    }

    /// Returns the test case's fully qualified name, i.e.
    /// `module_path::name`.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}::{}", self.module_path, self.name)
    }

    /// Returns the test case's name.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Runs the test case's body with the supplied fixture and returns its
    /// outcome.
    pub async fn run(&self, ctx: &Framework) -> TestOutcome {
        (self.function.f)(ctx).await
    }
}

inventory::collect!(TestCase);

pub fn all_test_cases() -> impl Iterator<Item = &'static TestCase> {
    inventory::iter::<TestCase>.into_iter()
}

/// Returns an iterator over the subset of tests for which (a) the fully
/// qualified name of the test includes every string in `must_include`, and
/// (b) the fully qualified name does not include any strings in
/// `must_exclude`.
pub fn filtered_test_cases<'rule>(
    must_include: &'rule [String],
    must_exclude: &'rule [String],
) -> impl Iterator<Item = &'static TestCase> + 'rule {
    inventory::iter::<TestCase>.into_iter().filter(|tc| {
        name_matches(&tc.fully_qualified_name(), must_include, must_exclude)
    })
}

fn name_matches(
    name: &str,
    must_include: &[String],
    must_exclude: &[String],
) -> bool {
    must_include.iter().all(|inc| name.contains(inc.as_str()))
        && must_exclude.iter().all(|exc| !name.contains(exc.as_str()))
}

/// Skips the current test. Usable anywhere the body can `return` an
/// `oswin_testcase::Result`; the `#[oswin_testcase]` wrapper turns the
/// error into [`TestOutcome::Skipped`].
#[macro_export]
macro_rules! oswin_skip {
    () => {
        return ::std::result::Result::Err(
            $crate::TestSkippedError::TestSkipped(::std::option::Option::None)
                .into(),
        )
    };
    ($($arg:tt)*) => {
        return ::std::result::Result::Err(
            $crate::TestSkippedError::TestSkipped(::std::option::Option::Some(
                ::std::format!($($arg)*),
            ))
            .into(),
        )
    };
}

#[cfg(test)]
mod test {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn include_and_exclude_filters_compose() {
        let name = "oswin_tests::resize::grow_disk_test";

        assert!(name_matches(name, &[], &[]));
        assert!(name_matches(name, &strings(&["resize"]), &[]));
        assert!(name_matches(
            name,
            &strings(&["resize", "grow"]),
            &strings(&["disks"])
        ));
        assert!(!name_matches(name, &strings(&["disks"]), &[]));
        assert!(!name_matches(name, &[], &strings(&["resize"])));
        assert!(!name_matches(
            name,
            &strings(&["resize"]),
            &strings(&["grow"])
        ));
    }

    #[test]
    fn skip_macro_yields_downcastable_error() {
        fn skipping(reason: &str) -> Result<()> {
            oswin_skip!("skipped because {reason}");
        }

        let err = skipping("no image").unwrap_err();
        match err.downcast_ref::<TestSkippedError>() {
            Some(TestSkippedError::TestSkipped(Some(msg))) => {
                assert_eq!(msg, "skipped because no image");
            }
            other => panic!("unexpected error shape: {other:?}"),
        }
    }
}
