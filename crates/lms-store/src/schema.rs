//! Collection names and the indexes each collection requires.
//!
//! The indexes back the filter, sort and group shapes built in
//! [`pipeline`](crate::pipeline) so none of them needs a full collection scan.

use bson::doc;
use mongodb::options::IndexOptions;
use mongodb::IndexModel;

/// Collection names.
pub mod collection {
    /// Course records.
    pub const COURSES: &str = "courses";

    /// Lesson records.
    pub const LESSONS: &str = "lessons";

    /// Enrollment records.
    pub const ENROLLMENTS: &str = "enrollments";

    /// Order records.
    pub const ORDERS: &str = "orders";

    /// Progress records.
    pub const PROGRESS: &str = "progresses";
}

/// Returns all collection names, in seeding order.
#[must_use]
pub fn all_collections() -> Vec<&'static str> {
    vec![
        collection::COURSES,
        collection::LESSONS,
        collection::ENROLLMENTS,
        collection::ORDERS,
        collection::PROGRESS,
    ]
}

fn named(keys: bson::Document, name: &str) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().name(name.to_string()).build())
        .build()
}

fn unique(keys: bson::Document, name: &str) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .name(name.to_string())
                .unique(true)
                .build(),
        )
        .build()
}

/// Indexes declared for a collection. Unknown names have none.
#[must_use]
pub fn indexes_for(name: &str) -> Vec<IndexModel> {
    match name {
        collection::COURSES => vec![
            unique(doc! { "slug": 1 }, "slug_unique"),
            named(doc! { "title": "text" }, "title_text"),
            named(doc! { "level": 1, "publishedAt": -1, "_id": -1 }, "lvl_pub_id"),
            named(doc! { "tags": 1, "publishedAt": -1, "_id": -1 }, "tags_pub_id"),
            named(doc! { "publishedAt": -1, "_id": -1 }, "pub_id"),
            named(doc! { "price": 1 }, "price"),
        ],
        collection::LESSONS => vec![
            unique(doc! { "slug": 1 }, "slug_unique"),
            named(doc! { "title": "text" }, "title_text"),
            named(doc! { "courseId": 1, "order": 1 }, "course_order"),
            named(
                doc! { "courseId": 1, "isPublished": 1, "order": 1 },
                "course_published_order",
            ),
            named(doc! { "type": 1, "isPublished": 1 }, "type_published"),
            named(doc! { "isFree": 1, "isPublished": 1 }, "free_published"),
        ],
        collection::ENROLLMENTS => vec![
            named(doc! { "courseId": 1, "enrolledAt": -1 }, "course_enrolled_at"),
            named(doc! { "userId": 1 }, "user"),
            named(doc! { "enrolledAt": -1 }, "enrolled_at"),
        ],
        collection::ORDERS => vec![
            named(
                doc! { "paidAt": -1, "status": 1, "courseId": 1 },
                "paid_status_course",
            ),
            named(doc! { "userId": 1 }, "user"),
        ],
        collection::PROGRESS => vec![
            named(
                doc! { "courseId": 1, "userId": 1, "updatedAt": -1 },
                "course_user_updated",
            ),
            named(doc! { "status": 1, "courseId": 1 }, "status_course"),
        ],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(models: &[IndexModel]) -> Vec<String> {
        models
            .iter()
            .filter_map(|m| m.options.as_ref().and_then(|o| o.name.clone()))
            .collect()
    }

    #[test]
    fn course_indexes_cover_sorted_filters() {
        let models = indexes_for(collection::COURSES);
        let names = names(&models);
        assert!(names.contains(&"lvl_pub_id".to_string()));
        assert!(names.contains(&"tags_pub_id".to_string()));
        assert!(names.contains(&"title_text".to_string()));

        let lvl = models
            .iter()
            .find(|m| m.options.as_ref().and_then(|o| o.name.as_deref()) == Some("lvl_pub_id"))
            .unwrap();
        let keys: Vec<_> = lvl.keys.keys().cloned().collect();
        assert_eq!(keys, vec!["level", "publishedAt", "_id"]);
        assert_eq!(lvl.keys.get_i32("publishedAt").unwrap(), -1);
    }

    #[test]
    fn slugs_are_unique() {
        for name in [collection::COURSES, collection::LESSONS] {
            let slug = indexes_for(name)
                .into_iter()
                .find(|m| m.keys.contains_key("slug"))
                .unwrap();
            assert_eq!(slug.options.and_then(|o| o.unique), Some(true));
        }
    }

    #[test]
    fn every_collection_declares_indexes() {
        for name in all_collections() {
            assert!(!indexes_for(name).is_empty(), "{name} has no indexes");
        }
        assert!(indexes_for("unknown").is_empty());
    }

    #[test]
    fn at_most_one_text_index_per_collection() {
        for name in all_collections() {
            let text = indexes_for(name)
                .iter()
                .filter(|m| m.keys.values().any(|v| v.as_str() == Some("text")))
                .count();
            assert!(text <= 1);
        }
    }
}
