//! Service catalog and visit frequencies.
//!
//! Rates are stored in mills (thousandths of a dollar) per square foot and
//! multipliers in percent, so all fee arithmetic stays in integers.

use serde::Serialize;

/// A billable cleaning service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Service {
    pub id: &'static str,
    pub name: &'static str,
    /// Rate in mills per square foot (80 = $0.08).
    pub rate_mills: u64,
}

impl Service {
    /// Rate in dollars per square foot.
    pub fn rate(&self) -> f64 {
        self.rate_mills as f64 / 1000.0
    }

    pub fn by_id(id: &str) -> Option<&'static Service> {
        SERVICES.iter().find(|s| s.id == id)
    }
}

/// How often the service is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Frequency {
    pub value: &'static str,
    pub label: &'static str,
    /// Monthly multiplier in percent (30 = x0.3).
    pub multiplier_pct: u64,
}

impl Frequency {
    pub fn multiplier(&self) -> f64 {
        self.multiplier_pct as f64 / 100.0
    }

    pub fn by_value(value: &str) -> Option<&'static Frequency> {
        FREQUENCIES.iter().find(|f| f.value == value)
    }
}

pub const SERVICES: &[Service] = &[
    Service {
        id: "commercial",
        name: "Commercial Cleaning",
        rate_mills: 80,
    },
    Service {
        id: "terminal",
        name: "Terminal Cleaning (Healthcare)",
        rate_mills: 150,
    },
    Service {
        id: "decontamination",
        name: "CBRN/Hazmat Decontamination",
        rate_mills: 250,
    },
    Service {
        id: "floor-care",
        name: "Floor & Carpet Care",
        rate_mills: 50,
    },
    Service {
        id: "post-construction",
        name: "Post-Construction Cleanup",
        rate_mills: 120,
    },
    Service {
        id: "emergency",
        name: "Emergency Response Services",
        rate_mills: 200,
    },
];

pub const FREQUENCIES: &[Frequency] = &[
    Frequency {
        value: "daily",
        label: "Daily",
        multiplier_pct: 100,
    },
    Frequency {
        value: "weekly",
        label: "Weekly",
        multiplier_pct: 30,
    },
    Frequency {
        value: "bi-weekly",
        label: "Bi-Weekly",
        multiplier_pct: 20,
    },
    Frequency {
        value: "monthly",
        label: "Monthly",
        multiplier_pct: 10,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id() {
        let s = Service::by_id("terminal").unwrap();
        assert_eq!(s.name, "Terminal Cleaning (Healthcare)");
        assert!((s.rate() - 0.15).abs() < f64::EPSILON);
        assert!(Service::by_id("window-washing").is_none());
    }

    #[test]
    fn lookup_frequency() {
        let f = Frequency::by_value("bi-weekly").unwrap();
        assert_eq!(f.label, "Bi-Weekly");
        assert!((f.multiplier() - 0.2).abs() < f64::EPSILON);
    }
}
