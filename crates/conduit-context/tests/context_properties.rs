//! Property tests for tolerance matching and identity uniqueness

use conduit_context::{ContextSettings, ConversionContext, GeometricIndex, PointMatch};
use conduit_model::{ExternalId, NativeRef, PlaceholderSet, Point3, VariantTag};
use proptest::prelude::*;

fn point_strategy() -> impl Strategy<Value = Point3> {
    (-1000.0f64..1000.0, -1000.0f64..1000.0, -1000.0f64..1000.0)
        .prop_map(|(x, y, z)| Point3::new(x, y, z))
}

proptest! {
    #[test]
    fn tolerance_is_respected(
        base in point_strategy(),
        dir in point_strategy(),
        eps in 1e-6f64..1e-1,
        factor in 0.0f64..3.0,
    ) {
        prop_assume!(dir.length() > 1e-3);
        let unit = dir * (1.0 / dir.length());
        let sample = base + unit * (eps * factor);

        let mut index = GeometricIndex::new(eps).unwrap();
        index.insert(base, "h".into(), None, "N1".into()).unwrap();
        let found = index.find(sample, None).unwrap();
        let distance = base.distance(sample);

        if distance <= eps {
            prop_assert!(matches!(found, PointMatch::Found(_)));
        } else {
            prop_assert_eq!(found, PointMatch::Missing);
        }
    }

    #[test]
    fn resolving_the_same_location_yields_one_entity(
        points in prop::collection::vec(point_strategy(), 1..20),
        repeats in 1usize..4,
    ) {
        let settings = ContextSettings::default();
        let mut ctx = ConversionContext::new(settings, &PlaceholderSet::new()).unwrap();
        let variant: VariantTag = "point".into();
        ctx.begin_node("doc".into());

        let mut handles = Vec::new();
        for _ in 0..repeats {
            for p in &points {
                handles.push(ctx.resolve_point(*p, None, &variant).unwrap().handle);
            }
        }
        ctx.commit_node();

        // every repeat maps to the handles of the first pass
        let first = &handles[..points.len()];
        for chunk in handles.chunks(points.len()) {
            prop_assert_eq!(chunk, first);
        }
        prop_assert!(ctx.geometry().len() <= points.len());
    }

    #[test]
    fn at_most_one_object_set_per_id_and_variant(
        registrations in prop::collection::vec((0u8..5, 0u8..3, 0u8..4), 1..40),
    ) {
        let mut ctx = ConversionContext::new(ContextSettings::default(), &PlaceholderSet::new()).unwrap();
        for (id, variant, handle) in &registrations {
            let id = ExternalId::new(format!("e{id}"));
            let object = NativeRef::new(format!("h{handle}").as_str().into(), format!("v{variant}").as_str());
            ctx.register(&id, [object.clone()], false).unwrap();
            ctx.register(&id, [object], false).unwrap();
        }

        for (id, variant, _) in &registrations {
            let id = ExternalId::new(format!("e{id}"));
            let variant = VariantTag::new(format!("v{variant}"));
            let handles = ctx.lookup(&id, &variant).unwrap();
            let mut deduped = handles.clone();
            deduped.sort();
            deduped.dedup();
            prop_assert_eq!(deduped.len(), handles.len());
        }
    }
}
