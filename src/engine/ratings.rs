use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::engine::normalize;
use crate::error::AppError;
use crate::models::request::{parse_rating, RequestStatus};
use crate::store::{Document, DocumentStore, OrderByDesc, REQUESTS};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianRating {
    /// Mean rating with two decimals, e.g. `"4.50"`.
    pub average_rating: String,
    pub total_ratings: usize,
    pub reviews: Vec<RatingReview>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingReview {
    pub rating: u8,
    pub review: String,
    pub order_id: String,
    pub created_at: Value,
}

#[derive(Default)]
struct Tally {
    sum: u32,
    count: usize,
    reviews: Vec<RatingReview>,
}

/// Derives per-technician ratings from completed, rated requests.
pub struct RatingAggregator {
    store: Arc<dyn DocumentStore>,
}

impl RatingAggregator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn technician_ratings(&self) -> Result<BTreeMap<String, TechnicianRating>, AppError> {
        let docs = self
            .store
            .list(REQUESTS, Some(OrderByDesc("createdAt")))
            .await?;

        let ratings = aggregate(&docs);
        debug!(technicians = ratings.len(), "computed technician ratings");
        Ok(ratings)
    }
}

/// Technicians without a qualifying request do not appear in the result.
pub fn aggregate(docs: &[Document]) -> BTreeMap<String, TechnicianRating> {
    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();

    for doc in docs {
        if doc.get_str("status") != Some(RequestStatus::Completed.as_str()) {
            continue;
        }
        let Some(rating) = doc.get("rating").and_then(parse_rating) else {
            continue;
        };
        let Some(technician_id) = doc.get_str("technicianId").filter(|id| !id.is_empty()) else {
            continue;
        };

        let tally = tallies.entry(technician_id.to_string()).or_default();
        tally.sum += u32::from(rating);
        tally.count += 1;

        if let Some(review) = doc.get_str("review") {
            tally.reviews.push(RatingReview {
                rating,
                review: review.to_string(),
                order_id: doc.id.clone(),
                created_at: doc
                    .get("createdAt")
                    .map(normalize::timestamp)
                    .unwrap_or(Value::Null),
            });
        }
    }

    tallies
        .into_iter()
        .map(|(technician_id, tally)| {
            let average = f64::from(tally.sum) / tally.count as f64;
            (
                technician_id,
                TechnicianRating {
                    average_rating: format!("{average:.2}"),
                    total_ratings: tally.count,
                    reviews: tally.reviews,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};

    use super::*;

    fn doc(id: &str, fields: Value) -> Document {
        let fields: Map<String, Value> = serde_json::from_value(fields).unwrap();
        Document {
            id: id.to_string(),
            fields,
        }
    }

    #[test]
    fn averages_to_two_decimals() {
        let docs = vec![
            doc(
                "r1",
                json!({ "status": "completed", "technicianId": "t1", "rating": 4, "review": "good" }),
            ),
            doc(
                "r2",
                json!({ "status": "completed", "technicianId": "t1", "rating": 5, "review": null }),
            ),
        ];

        let ratings = aggregate(&docs);
        let t1 = &ratings["t1"];
        assert_eq!(t1.average_rating, "4.50");
        assert_eq!(t1.total_ratings, 2);
        assert_eq!(t1.reviews.len(), 1);
        assert_eq!(t1.reviews[0].order_id, "r1");
        assert_eq!(t1.reviews[0].review, "good");
    }

    #[test]
    fn skips_unqualified_requests() {
        let docs = vec![
            doc("zero", json!({ "status": "completed", "technicianId": "t1", "rating": 0 })),
            doc("open", json!({ "status": "in_progress", "technicianId": "t1", "rating": 5 })),
            doc("high", json!({ "status": "completed", "technicianId": "t1", "rating": 7 })),
            doc("nobody", json!({ "status": "completed", "rating": 4 })),
            doc("unrated", json!({ "status": "completed", "technicianId": "t2" })),
        ];

        assert!(aggregate(&docs).is_empty());
    }

    #[test]
    fn repeating_decimals_are_rounded() {
        let docs = vec![
            doc("a", json!({ "status": "completed", "technicianId": "t", "rating": 5 })),
            doc("b", json!({ "status": "completed", "technicianId": "t", "rating": 4 })),
            doc("c", json!({ "status": "completed", "technicianId": "t", "rating": 4 })),
        ];

        assert_eq!(aggregate(&docs)["t"].average_rating, "4.33");
    }

    #[test]
    fn review_timestamps_are_normalized() {
        let docs = vec![doc(
            "r1",
            json!({
                "status": "completed",
                "technicianId": "t1",
                "rating": 5,
                "review": "fast",
                "createdAt": { "_seconds": 0, "_nanoseconds": 0 }
            }),
        )];

        let ratings = aggregate(&docs);
        assert_eq!(
            ratings["t1"].reviews[0].created_at,
            json!("1970-01-01T00:00:00.000Z")
        );
    }
}
