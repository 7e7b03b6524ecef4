//! Filter, projection and sort documents sent to the profiler collection

use mongodb::bson::{Document, doc};

use crate::models::QueryShapeId;

/// Collection the database profiler writes to
pub const PROFILE_COLLECTION: &str = "system.profile";

/// Field grouping entries by query shape
pub const SHAPE_FIELD: &str = "queryHash";

fn millis_bound(min_millis: u64) -> i64 {
    i64::try_from(min_millis).unwrap_or(i64::MAX)
}

/// Query entries carrying a command, excluding cursor continuations.
pub fn shapes_filter(min_millis: u64) -> Document {
    doc! {
        "op": "query",
        "command": { "$exists": true },
        "command.getMore": { "$exists": false },
        "millis": { "$gte": millis_bound(min_millis) }
    }
}

pub fn sample_filter(shape: &QueryShapeId, min_millis: u64) -> Document {
    doc! {
        SHAPE_FIELD: shape.as_str(),
        "millis": { "$gte": millis_bound(min_millis) }
    }
}

pub fn sample_projection() -> Document {
    doc! { "op": 1, "ns": 1, "millis": 1, "command": 1 }
}

/// Slowest first
pub fn sample_sort() -> Document {
    doc! { "millis": -1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::Bson;

    #[test]
    fn test_shapes_filter_excludes_get_more() {
        let filter = shapes_filter(100);
        assert_eq!(filter.get_str("op").unwrap(), "query");
        assert!(filter.get_document("command").unwrap().get_bool("$exists").unwrap());
        assert!(!filter.get_document("command.getMore").unwrap().get_bool("$exists").unwrap());
        assert_eq!(filter.get_document("millis").unwrap().get("$gte"), Some(&Bson::Int64(100)));
    }

    #[test]
    fn test_sample_filter_targets_shape() {
        let filter = sample_filter(&QueryShapeId::new("3A1F2B7C"), 0);
        assert_eq!(filter.get_str(SHAPE_FIELD).unwrap(), "3A1F2B7C");
        assert_eq!(filter.get_document("millis").unwrap().get("$gte"), Some(&Bson::Int64(0)));
    }

    #[test]
    fn test_huge_duration_bound_saturates() {
        let filter = shapes_filter(u64::MAX);
        assert_eq!(
            filter.get_document("millis").unwrap().get("$gte"),
            Some(&Bson::Int64(i64::MAX))
        );
    }

    #[test]
    fn test_sample_projection_and_sort() {
        let projection = sample_projection();
        let keys: Vec<&str> = projection.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["op", "ns", "millis", "command"]);
        assert_eq!(sample_sort().get_i32("millis").unwrap(), -1);
    }
}
