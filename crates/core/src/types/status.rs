//! Status and role labels stored as free text in the hosted database.
//!
//! Neither column is constrained server-side, so parsing is lenient: unknown
//! order statuses are preserved verbatim and unknown roles fall back to
//! [`UserRole::Customer`].

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Order status label.
///
/// New orders are written as `Processing`. Nothing in the storefront moves an
/// order between states; the labels only drive the progress display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum OrderStatus {
    #[default]
    Processing,
    Shipped,
    Completed,
    /// Any other label an operator typed into the database.
    Other(String),
}

impl OrderStatus {
    /// Parse a stored label (case-insensitive). Blank labels mean `Processing`.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "processing" => Self::Processing,
            "shipped" => Self::Shipped,
            "completed" => Self::Completed,
            _ => Self::Other(trimmed.to_owned()),
        }
    }

    /// Progress step for the order tracker: 1 processing, 2 shipped, 3 completed.
    ///
    /// Unrecognized labels show as the first step.
    #[must_use]
    pub const fn step(&self) -> u8 {
        match self {
            Self::Shipped => 2,
            Self::Completed => 3,
            Self::Processing | Self::Other(_) => 1,
        }
    }

    /// The label as stored and displayed.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Completed => "Completed",
            Self::Other(label) => label,
        }
    }

    /// CSS modifier for the status badge.
    #[must_use]
    pub const fn badge_class(&self) -> &'static str {
        match self {
            Self::Processing => "badge-processing",
            Self::Shipped => "badge-shipped",
            Self::Completed => "badge-completed",
            Self::Other(_) => "badge-other",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.map_or(Self::Processing, |l| Self::parse(&l)))
    }
}

/// Role of an `app_user` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}

impl UserRole {
    /// Parse a stored role. Anything other than `admin` is a customer.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::Customer
        }
    }

    /// The label as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }

    /// Whether this role may use the admin panel.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for UserRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.map_or(Self::Customer, |l| Self::parse(&l)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_parse_is_case_insensitive() {
        assert_eq!(OrderStatus::parse("shipped"), OrderStatus::Shipped);
        assert_eq!(OrderStatus::parse("COMPLETED"), OrderStatus::Completed);
        assert_eq!(OrderStatus::parse(""), OrderStatus::Processing);
        assert_eq!(
            OrderStatus::parse("On Hold"),
            OrderStatus::Other("On Hold".to_string())
        );
    }

    #[test]
    fn test_order_status_steps() {
        assert_eq!(OrderStatus::Processing.step(), 1);
        assert_eq!(OrderStatus::Shipped.step(), 2);
        assert_eq!(OrderStatus::Completed.step(), 3);
        assert_eq!(OrderStatus::Other("Returned".into()).step(), 1);
    }

    #[test]
    fn test_null_status_deserializes_as_processing() {
        let status: OrderStatus = serde_json::from_str("null").unwrap();
        assert_eq!(status, OrderStatus::Processing);
        assert_eq!(status.to_string(), "Processing");
    }

    #[test]
    fn test_user_role_defaults_to_customer() {
        assert_eq!(UserRole::parse("admin"), UserRole::Admin);
        assert_eq!(UserRole::parse("Admin "), UserRole::Admin);
        assert_eq!(UserRole::parse("staff"), UserRole::Customer);
        let role: UserRole = serde_json::from_str("null").unwrap();
        assert_eq!(role, UserRole::Customer);
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"admin\"");
    }
}
