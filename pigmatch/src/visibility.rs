//! Which sightings a hunter may see and request, and which hunters care about a sighting.
//!
//! The rule is fixed per deployment by [`VisibilityPolicy`]:
//! - `subscriptions`: a sighting is visible iff one of the hunter's *active* subscription
//!   circles contains the sighting point;
//! - `open`: every open sighting is visible to every hunter.
//!
//! Only open sightings whose property is known are ever candidates.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::{properties::Property, sightings::Sighting, subscriptions::Subscription};
use crate::geo::{GeoPoint, distance_km};
use crate::types::{PropertyId, UserId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityPolicy {
    #[default]
    Subscriptions,
    Open,
}

impl VisibilityPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityPolicy::Subscriptions => "subscriptions",
            VisibilityPolicy::Open => "open",
        }
    }
}

/// Everything visibility needs to know about the hunter asking.
#[derive(Debug, Clone)]
pub struct HunterView {
    pub hunter_id: UserId,
    pub subscriptions: Vec<Subscription>,
    /// Used for distance ordering only
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleSighting {
    pub sighting: Sighting,
    pub property: Property,
    /// Distance from the hunter's location, when known
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InterestedHunter {
    #[schema(value_type = String, format = "uuid")]
    pub hunter_id: UserId,
    /// Distance from the sighting to the nearest matching subscription center
    pub distance_km: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VisibilityResolver {
    policy: VisibilityPolicy,
}

impl VisibilityResolver {
    pub fn new(policy: VisibilityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> VisibilityPolicy {
        self.policy
    }

    /// Whether `hunter` may see and request a sighting at `point`.
    pub fn admits(&self, hunter: &HunterView, point: GeoPoint) -> bool {
        match self.policy {
            VisibilityPolicy::Open => true,
            VisibilityPolicy::Subscriptions => hunter
                .subscriptions
                .iter()
                .any(|s| s.hunter_id == hunter.hunter_id && s.covers(point)),
        }
    }

    /// Sightings `hunter` may see, nearest first (unknown distance last), ties by sighting id.
    pub fn visible_sightings(
        &self,
        hunter: &HunterView,
        sightings: &[Sighting],
        properties: &HashMap<PropertyId, Property>,
    ) -> Vec<VisibleSighting> {
        let mut visible: Vec<VisibleSighting> = sightings
            .iter()
            .filter(|s| s.is_open())
            .filter_map(|s| properties.get(&s.property_id).map(|p| (s, p)))
            .filter(|(s, _)| self.admits(hunter, s.location))
            .map(|(s, p)| VisibleSighting {
                sighting: s.clone(),
                property: p.clone(),
                distance_km: hunter.location.map(|here| distance_km(here, s.location)),
            })
            .collect();

        visible.sort_by(|a, b| {
            compare_distance(a.distance_km, b.distance_km).then_with(|| a.sighting.id.cmp(&b.sighting.id))
        });
        visible
    }
}

/// Hunters with an active subscription covering the sighting, one entry per hunter, nearest
/// subscription center first, ties by hunter id.
pub fn interested_hunters(sighting: &Sighting, subscriptions: &[Subscription]) -> Vec<InterestedHunter> {
    let mut nearest: HashMap<UserId, f64> = HashMap::new();
    for subscription in subscriptions.iter().filter(|s| s.covers(sighting.location)) {
        let distance = distance_km(subscription.center, sighting.location);
        nearest
            .entry(subscription.hunter_id)
            .and_modify(|d| *d = d.min(distance))
            .or_insert(distance);
    }

    let mut hunters: Vec<InterestedHunter> = nearest
        .into_iter()
        .map(|(hunter_id, distance_km)| InterestedHunter { hunter_id, distance_km })
        .collect();
    hunters.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km).then_with(|| a.hunter_id.cmp(&b.hunter_id)));
    hunters
}

fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::assess_notes;
    use crate::db::models::sightings::SightingStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn property(owner_id: UserId, location: GeoPoint) -> Property {
        Property {
            id: Uuid::new_v4(),
            owner_id,
            name: "Waimea Parcel".to_string(),
            location,
            notes: None,
            island: Some("Hawaii".to_string()),
            max_hunters: None,
            size_acres: None,
            daily_rate: None,
            created_at: Utc::now(),
        }
    }

    fn sighting(property: &Property, location: GeoPoint) -> Sighting {
        let assessment = assess_notes(None);
        Sighting {
            id: Uuid::new_v4(),
            property_id: property.id,
            reporter_id: property.owner_id,
            location,
            seen_at: Utc::now(),
            count_estimate: None,
            notes: None,
            status: SightingStatus::Open,
            credibility_score: assessment.credibility_score,
            tags: assessment.tags,
            summary: assessment.summary,
            created_at: Utc::now(),
        }
    }

    fn subscription(hunter_id: UserId, center: GeoPoint, radius_km: f64) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            hunter_id,
            center,
            radius_km,
            active: true,
            created_at: Utc::now(),
        }
    }

    // Hilo, and points roughly 11 km and 111 km north of it
    const HILO: GeoPoint = GeoPoint { lat: 19.7, lng: -155.08 };
    const NEAR: GeoPoint = GeoPoint { lat: 19.8, lng: -155.08 };
    const FAR: GeoPoint = GeoPoint { lat: 20.7, lng: -155.08 };

    struct World {
        properties: HashMap<PropertyId, Property>,
        near: Sighting,
        far: Sighting,
    }

    fn world() -> World {
        let p = property(Uuid::new_v4(), HILO);
        let near = sighting(&p, NEAR);
        let far = sighting(&p, FAR);
        World {
            properties: HashMap::from([(p.id, p)]),
            near,
            far,
        }
    }

    #[test]
    fn test_subscription_policy_filters_by_radius() {
        let w = world();
        let hunter_id = Uuid::new_v4();
        let hunter = HunterView {
            hunter_id,
            subscriptions: vec![subscription(hunter_id, HILO, 20.0)],
            location: None,
        };
        let resolver = VisibilityResolver::new(VisibilityPolicy::Subscriptions);

        let visible = resolver.visible_sightings(&hunter, &[w.near.clone(), w.far.clone()], &w.properties);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].sighting.id, w.near.id);
        assert_eq!(visible[0].distance_km, None);
    }

    #[test]
    fn test_ten_km_subscription_around_honolulu() {
        let center = GeoPoint { lat: 21.30, lng: -157.80 };
        let p = property(Uuid::new_v4(), center);
        let inside = sighting(&p, GeoPoint { lat: 21.32, lng: -157.79 });
        let outside = sighting(&p, GeoPoint { lat: 21.50, lng: -158.10 });
        let properties = HashMap::from([(p.id, p)]);

        let hunter_id = Uuid::new_v4();
        let mut hunter = HunterView {
            hunter_id,
            subscriptions: vec![subscription(hunter_id, center, 10.0)],
            location: None,
        };
        let resolver = VisibilityResolver::new(VisibilityPolicy::Subscriptions);

        let visible = resolver.visible_sightings(&hunter, &[outside.clone(), inside.clone()], &properties);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].sighting.id, inside.id);
        assert!(resolver.admits(&hunter, inside.location));
        assert!(!resolver.admits(&hunter, outside.location));

        hunter.location = Some(center);
        let visible = resolver.visible_sightings(&hunter, &[outside, inside], &properties);
        let distance = visible[0].distance_km.unwrap();
        assert!((2.3..2.6).contains(&distance), "distance was {distance}");
    }

    #[test]
    fn test_inactive_or_foreign_subscriptions_do_not_count() {
        let w = world();
        let hunter_id = Uuid::new_v4();
        let mut inactive = subscription(hunter_id, HILO, 500.0);
        inactive.active = false;
        let someone_elses = subscription(Uuid::new_v4(), HILO, 500.0);
        let hunter = HunterView {
            hunter_id,
            subscriptions: vec![inactive, someone_elses],
            location: None,
        };
        let resolver = VisibilityResolver::new(VisibilityPolicy::Subscriptions);
        assert!(resolver.visible_sightings(&hunter, &[w.near, w.far], &w.properties).is_empty());

        let nobody = HunterView {
            hunter_id,
            subscriptions: vec![],
            location: None,
        };
        assert!(resolver.visible_sightings(&nobody, &[], &w.properties).is_empty());
    }

    #[test]
    fn test_open_policy_orders_by_distance() {
        let w = world();
        let hunter = HunterView {
            hunter_id: Uuid::new_v4(),
            subscriptions: vec![],
            location: Some(FAR),
        };
        let resolver = VisibilityResolver::new(VisibilityPolicy::Open);

        let visible = resolver.visible_sightings(&hunter, &[w.near.clone(), w.far.clone()], &w.properties);
        let ids: Vec<_> = visible.iter().map(|v| v.sighting.id).collect();
        assert_eq!(ids, vec![w.far.id, w.near.id]);
        assert_eq!(visible[0].distance_km, Some(0.0));
    }

    #[test]
    fn test_closed_and_orphaned_sightings_are_excluded() {
        let mut w = world();
        w.far.status = SightingStatus::Closed;
        let orphan = sighting(&property(Uuid::new_v4(), HILO), HILO);

        let hunter = HunterView {
            hunter_id: Uuid::new_v4(),
            subscriptions: vec![],
            location: None,
        };
        let resolver = VisibilityResolver::new(VisibilityPolicy::Open);
        let visible = resolver.visible_sightings(&hunter, &[w.near.clone(), w.far, orphan], &w.properties);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].sighting.id, w.near.id);
    }

    #[test]
    fn test_unknown_distance_ties_break_by_id() {
        let w = world();
        let hunter = HunterView {
            hunter_id: Uuid::new_v4(),
            subscriptions: vec![],
            location: None,
        };
        let resolver = VisibilityResolver::new(VisibilityPolicy::Open);
        let visible = resolver.visible_sightings(&hunter, &[w.near.clone(), w.far.clone()], &w.properties);
        let mut expected = vec![w.near.id, w.far.id];
        expected.sort();
        assert_eq!(visible.iter().map(|v| v.sighting.id).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_interested_hunters_dedup_and_order() {
        let w = world();
        let close = Uuid::new_v4();
        let distant = Uuid::new_v4();
        let inactive_hunter = Uuid::new_v4();
        let mut inactive = subscription(inactive_hunter, NEAR, 50.0);
        inactive.active = false;

        let subscriptions = vec![
            subscription(distant, HILO, 30.0),
            subscription(close, HILO, 30.0),
            subscription(close, NEAR, 5.0),
            subscription(Uuid::new_v4(), FAR, 10.0),
            inactive,
        ];

        let hunters = interested_hunters(&w.near, &subscriptions);
        assert_eq!(hunters.len(), 2);
        assert_eq!(hunters[0].hunter_id, close);
        assert_eq!(hunters[0].distance_km, 0.0);
        assert_eq!(hunters[1].hunter_id, distant);
        assert!((hunters[1].distance_km - 11.1).abs() < 0.2);
    }
}
