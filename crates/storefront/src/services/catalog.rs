//! Sample catalog used to stock an empty store.

use bazaar_core::{Price, ProductNo};

use crate::backend::Product;

const IMAGE_BASE: &str = "https://images.unsplash.com";

struct Sample {
    description: &'static str,
    cents: i64,
    quantity: i64,
    product_type: &'static str,
    sales: &'static str,
    details: &'static str,
    photo: &'static str,
}

const SAMPLES: [Sample; 8] = [
    Sample {
        description: "Premium Laptop",
        cents: 99_999,
        quantity: 15,
        product_type: "Electronics",
        sales: "Hot",
        details: "High-performance laptop with 16GB RAM, 512GB SSD, and a powerful processor.",
        photo: "photo-1496181133206-80ce9b88a853",
    },
    Sample {
        description: "Casual T-Shirt",
        cents: 4_999,
        quantity: 50,
        product_type: "Clothing",
        sales: "Regular",
        details: "Comfortable cotton t-shirt available in various colors and sizes.",
        photo: "photo-1521572163474-6864f9cf17ab",
    },
    Sample {
        description: "Coffee Maker",
        cents: 12_999,
        quantity: 20,
        product_type: "Home",
        sales: "Regular",
        details: "Programmable coffee maker with 12-cup capacity and auto shut-off feature.",
        photo: "photo-1517668808822-9ebb02f2a0e6",
    },
    Sample {
        description: "Wireless Headphones",
        cents: 7_999,
        quantity: 30,
        product_type: "Accessories",
        sales: "Hot",
        details: "Bluetooth headphones with noise cancellation and 20-hour battery life.",
        photo: "photo-1505740420928-5e560c06d30e",
    },
    Sample {
        description: "Smart Watch",
        cents: 19_999,
        quantity: 10,
        product_type: "Electronics",
        sales: "Hot",
        details: "Fitness tracker with heart rate monitor, GPS, and water resistance.",
        photo: "photo-1523275335684-37898b6baf30",
    },
    Sample {
        description: "Wireless Speaker",
        cents: 29_999,
        quantity: 8,
        product_type: "Electronics",
        sales: "Regular",
        details: "Portable Bluetooth speaker with 360-degree sound and 12-hour battery life.",
        photo: "photo-1608043152269-423dbba4e7e1",
    },
    Sample {
        description: "Kitchen Knife Set",
        cents: 5_999,
        quantity: 25,
        product_type: "Home",
        sales: "Regular",
        details: "Professional 5-piece knife set with ergonomic handles and stainless steel blades.",
        photo: "photo-1593618998160-e34014e67546",
    },
    Sample {
        description: "Winter Jacket",
        cents: 8_999,
        quantity: 15,
        product_type: "Clothing",
        sales: "Seasonal",
        details: "Warm and waterproof jacket perfect for cold weather conditions.",
        photo: "photo-1539533113208-f6df8cc8b543",
    },
];

/// The eight sample products, numbered from 1.
#[must_use]
pub fn sample_products() -> Vec<Product> {
    (1_i64..)
        .zip(SAMPLES.iter())
        .map(|(no, sample)| Product {
            product_no: ProductNo::new(no),
            product_price: Price::from_cents(sample.cents),
            quantity_available: sample.quantity,
            product_type: sample.product_type.to_string(),
            p_description: sample.description.to_string(),
            product_sales: sample.sales.to_string(),
            p_details: sample.details.to_string(),
            product_image: Some(format!("{IMAGE_BASE}/{}?q=80&w=800", sample.photo)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_catalog_is_numbered_sequentially() {
        let products = sample_products();
        assert_eq!(products.len(), 8);
        for (idx, product) in products.iter().enumerate() {
            assert_eq!(product.product_no.as_i64(), idx as i64 + 1);
            assert!(product.in_stock());
        }
    }

    #[test]
    fn test_sample_catalog_contents() {
        let products = sample_products();
        assert_eq!(products[0].p_description, "Premium Laptop");
        assert_eq!(products[0].product_price, Price::from_cents(99_999));
        assert_eq!(products[7].product_sales, "Seasonal");
        assert_eq!(
            products[3].product_image.as_deref(),
            Some("https://images.unsplash.com/photo-1505740420928-5e560c06d30e?q=80&w=800")
        );
    }
}
