use paravet::{
    config::{Bound, Config},
    scenarios::Scenario,
    types::err::ErrorKind,
};

fn bounds(k: i64, d: i64) -> Config {
    Config {
        max_clause_size: Bound::from_cli(k),
        max_clause_rank: Bound::from_cli(d),
        ..Config::default()
    }
}

mod proofs {
    use super::*;

    #[test]
    fn find_last() {
        assert!(Scenario::FindLast.run(bounds(2, 1)).is_ok());
    }

    #[test]
    fn find_last_with_default_bounds() {
        assert!(Scenario::FindLast.run(Config::default()).is_ok());
    }

    #[test]
    fn resource_manager() {
        assert!(Scenario::ResourceManager.run(bounds(2, 2)).is_ok());
    }

    #[test]
    fn cve_2014_7841() {
        assert!(Scenario::Cve20147841.run(bounds(2, -1)).is_ok());
    }

    #[test]
    fn build_lists() {
        assert!(Scenario::BuildLists.run(bounds(-1, -1)).is_ok());
    }

    #[test]
    fn null_rc() {
        assert!(Scenario::NullRc.run(bounds(2, 1)).is_ok());
    }
}

mod bounds_respected {
    use super::*;

    /// Tight bounds may lose the proof, but never termination or soundness.
    #[test]
    fn every_scenario_terminates_at_the_smallest_bounds() {
        for scenario in Scenario::all() {
            let outcome = scenario.run(bounds(2, 1));
            assert!(
                matches!(outcome, Ok(()) | Err(ErrorKind::Proof(_))),
                "{}: unexpected outcome {outcome:?}",
                scenario.name()
            );
        }
    }
}
