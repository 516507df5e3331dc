//! Demo data for a freshly started service.
//!
//! Everything here draws from a caller-supplied [`Rng`], so a seeded
//! `StdRng` gives reproducible content.

use chrono::{Duration, Utc};
use rand::Rng;

use crate::{
    model::{GeoPoint, NewReport, Report, ReportCategory, ReportPriority, ReportStatus},
    reports_memory::InMemoryReports,
    store::ReportStore,
};

struct City {
    name: &'static str,
    center: GeoPoint,
    wards: [&'static str; 8],
}

const fn city(name: &'static str, lat: f64, lng: f64, wards: [&'static str; 8]) -> City {
    City { name, center: GeoPoint { lat, lng }, wards }
}

const CITIES: [City; 10] = [
    city("Chennai", 13.0827, 80.2707, ["T. Nagar", "Velachery", "Adyar", "Anna Nagar", "Mylapore", "Tambaram", "Chromepet", "Pallavaram"]),
    city("Bengaluru", 12.9716, 77.5946, ["Whitefield", "Koramangala", "Indiranagar", "Jayanagar", "Yelahanka", "Marathahalli", "Electronic City", "HSR Layout"]),
    city("Hyderabad", 17.3850, 78.4867, ["Hitech City", "Madhapur", "Banjara Hills", "Secunderabad", "Kukatpally", "Gachibowli", "Kondapur", "Begumpet"]),
    city("Mumbai", 19.0760, 72.8777, ["Andheri", "Bandra", "Dadar", "Borivali", "Powai", "Goregaon", "Malad", "Kandivali"]),
    city("Delhi", 28.6139, 77.2090, ["Dwarka", "Rohini", "Saket", "Karol Bagh", "Lajpat Nagar", "Pitampura", "Janakpuri", "Vasant Kunj"]),
    city("Thiruvallur", 13.139, 79.908, ["Tiruvallur", "Poonamallee", "Avadi", "Tiruverkadu", "Pattabiram", "Ambattur", "Red Hills", "Manali"]),
    city("Kochi", 9.9312, 76.2673, ["Fort Kochi", "Kadavanthra", "Edapally", "Vyttila", "Kakkanad", "Aluva", "Thripunithura", "Palarivattom"]),
    city("Pune", 18.5204, 73.8567, ["Hinjewadi", "Koregaon Park", "Baner", "Aundh", "Viman Nagar", "Kharadi", "Wakad", "Pimpri"]),
    city("Kolkata", 22.5726, 88.3639, ["Salt Lake", "New Town", "Park Street", "Ballygunge", "Gariahat", "Behala", "Tollygunge", "Jadavpur"]),
    city("Ahmedabad", 23.0225, 72.5714, ["Vastrapur", "Bodakdev", "Satellite", "Maninagar", "Naroda", "Bapunagar", "Chandkheda", "Gota"]),
];

const USERS: [(&str, &str); 20] = [
    ("u001", "Arun"),
    ("u002", "Priya"),
    ("u003", "Rahul"),
    ("u004", "Sneha"),
    ("u005", "Vikram"),
    ("u006", "Anita"),
    ("u007", "Kiran"),
    ("u008", "Meera"),
    ("u009", "Rajesh"),
    ("u010", "Kavitha"),
    ("u011", "Suresh"),
    ("u012", "Deepa"),
    ("u013", "Manoj"),
    ("u014", "Lakshmi"),
    ("u015", "Ganesh"),
    ("u016", "Pooja"),
    ("u017", "Ravi"),
    ("u018", "Sunita"),
    ("u019", "Kumar"),
    ("u020", "Radha"),
];

const MAX_AGE_MS: i64 = 1000 * 60 * 60 * 24 * 14;

fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, base: f64, delta: f64) -> f64 {
    base + (rng.gen::<f64>() - 0.5) * delta
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Fill an empty store with `count` randomized reports spread over ten
/// cities. Returns how many were inserted; a non-empty store is left alone.
pub fn seed_sample_data<R: Rng + ?Sized>(store: &InMemoryReports, count: usize, rng: &mut R) -> usize {
    if !store.is_empty() {
        tracing::debug!("store already holds reports, skipping sample data");
        return 0;
    }

    let now = Utc::now();
    for _ in 0..count {
        let city = pick(rng, &CITIES);
        let ward = *pick(rng, &city.wards);
        let category = *pick(rng, &ReportCategory::ALL);
        let status = *pick(rng, &ReportStatus::ALL);
        let (user_id, username) = *pick(rng, &USERS);
        let lat = jitter(rng, city.center.lat, 0.18);
        let lng = jitter(rng, city.center.lng, 0.24);
        let age = Duration::milliseconds(rng.gen_range(0..MAX_AGE_MS));

        let upvotes = if rng.gen_bool(0.5) { rng.gen_range(0..12usize) } else { 0 };
        let upvoted_by: Vec<String> = USERS
            .iter()
            .take(upvotes)
            .map(|(id, _)| id.to_string())
            .collect();

        store.insert_existing(Report {
            id: 0,
            title: format!("{} issue in {}", capitalize(category.as_str()), ward),
            description: format!(
                "Reported {} issue affecting residents of {}, {}.",
                category.as_str(),
                ward,
                city.name
            ),
            category,
            priority: ReportPriority::Low,
            priority_score: 0,
            upvotes: 0,
            upvoted_by,
            status,
            created_at: now - age,
            created_by_user_id: user_id.to_string(),
            created_by_username: Some(username.to_string()),
            attachments: Vec::new(),
            location: Some(GeoPoint { lat, lng }),
            location_name: Some(format!("{}, {}", ward, city.name)),
        });
    }

    tracing::info!("seeded {} sample reports", count);
    count
}

struct TestReport {
    title: &'static str,
    description: &'static str,
    category: ReportCategory,
    user: u8,
    location: GeoPoint,
    location_name: &'static str,
}

const TEST_REPORTS: [TestReport; 7] = [
    TestReport {
        title: "Broken streetlight on Main Road",
        description: "Streetlight has been broken for 3 days, making the area unsafe at night",
        category: ReportCategory::Electricity,
        user: 1,
        location: GeoPoint { lat: 13.0827, lng: 80.2707 },
        location_name: "T. Nagar, Chennai",
    },
    TestReport {
        title: "Sewage overflow near bus stop",
        description: "Sewage is overflowing and causing bad smell in the area",
        category: ReportCategory::Sewage,
        user: 2,
        location: GeoPoint { lat: 13.0827, lng: 80.2707 },
        location_name: "Velachery, Chennai",
    },
    TestReport {
        title: "Pothole on highway",
        description: "Large pothole causing traffic issues and vehicle damage",
        category: ReportCategory::Roads,
        user: 3,
        location: GeoPoint { lat: 12.9716, lng: 77.5946 },
        location_name: "Koramangala, Bengaluru",
    },
    TestReport {
        title: "Garbage not collected",
        description: "Garbage has not been collected for a week, causing health issues",
        category: ReportCategory::Waste,
        user: 4,
        location: GeoPoint { lat: 17.3850, lng: 78.4867 },
        location_name: "Hitech City, Hyderabad",
    },
    TestReport {
        title: "Bus stop shelter damaged",
        description: "Bus stop shelter is damaged and needs repair",
        category: ReportCategory::Transport,
        user: 5,
        location: GeoPoint { lat: 19.0760, lng: 72.8777 },
        location_name: "Andheri, Mumbai",
    },
    TestReport {
        title: "Water logging on street",
        description: "Heavy rain caused water logging, making it difficult to walk",
        category: ReportCategory::Sewage,
        user: 6,
        location: GeoPoint { lat: 28.6139, lng: 77.2090 },
        location_name: "Dwarka, Delhi",
    },
    TestReport {
        title: "Power outage in area",
        description: "No electricity for the past 6 hours",
        category: ReportCategory::Electricity,
        user: 7,
        location: GeoPoint { lat: 18.5204, lng: 73.8567 },
        location_name: "Hinjewadi, Pune",
    },
];

/// Create the fixed set of demo reports through the regular store
/// operations, giving about half of them a handful of upvotes.
pub fn add_test_reports<R: Rng + ?Sized>(store: &dyn ReportStore, rng: &mut R) -> usize {
    for t in &TEST_REPORTS {
        let report = store.create(NewReport {
            title: t.title.to_string(),
            description: t.description.to_string(),
            category: Some(t.category),
            created_by_user_id: format!("test-user-{}", t.user),
            created_by_username: Some(format!("Test User {}", t.user)),
            attachments: Vec::new(),
            location: Some(t.location),
            location_name: Some(t.location_name.to_string()),
        });
        if rng.gen_bool(0.5) {
            let upvotes = rng.gen_range(1..=5);
            for i in 0..upvotes {
                store.upvote(report.id, &format!("test-upvoter-{}", i));
            }
        }
        tracing::debug!("created test report {} at {}", report.title, t.location_name);
    }
    TEST_REPORTS.len()
}
