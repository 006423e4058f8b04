mod common;
use crate::common::builders::{ConfigFileBuilder, UnitConfigBuilder};
use crate::common::mock_workspace;

use std::collections::BTreeSet;

use proptest::prelude::*;
use unitdag::build_targets;
use unitdag::config::ConfigFile;
use unitdag::types::BuildMode;

// Acyclic by construction: unit N may only depend on units 0..N-1.
fn dag_config_strategy(max_units: usize) -> impl Strategy<Value = (ConfigFile, Vec<Vec<usize>>)> {
    (1..=max_units).prop_flat_map(|num_units| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_units),
            num_units,
        )
        .prop_map(move |raw_deps| {
            let mut builder = ConfigFileBuilder::new();
            let mut deps_of = Vec::with_capacity(num_units);
            for (i, potential) in raw_deps.into_iter().enumerate() {
                let deps: BTreeSet<usize> = if i == 0 {
                    BTreeSet::new()
                } else {
                    potential.into_iter().map(|d| d % i).collect()
                };
                let mut unit = UnitConfigBuilder::new(&format!("units/u{i}")).style("sass");
                for dep in &deps {
                    unit = unit.dep(&format!("u{dep}"));
                }
                builder = builder.with_unit(&format!("u{i}"), unit.build());
                deps_of.push(deps.into_iter().collect());
            }
            (builder.build(), deps_of)
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_unit_runs_once_after_its_dependencies((cfg, deps_of) in dag_config_strategy(8)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let w = mock_workspace(&cfg, &[]);
        let targets = w.ctx.registry.targets();

        let report = runtime
            .block_on(build_targets(&w.ctx, &targets, BuildMode::Force))
            .unwrap();
        prop_assert!(report.is_success());

        let invocations = w.executor.invocations();
        prop_assert_eq!(invocations.len(), deps_of.len());

        let position = |unit: usize| {
            let task = format!("u{unit}:style");
            invocations.iter().position(|t| *t == task)
        };
        for (unit, deps) in deps_of.iter().enumerate() {
            let own = position(unit);
            prop_assert!(own.is_some(), "u{} never ran", unit);
            for dep in deps {
                prop_assert!(position(*dep) < own, "u{} ran before its dependency u{}", unit, dep);
            }
        }
    }
}
