use serde::Serialize;

/// One entry of the fixed service catalog. `base_price` is in SAR; `None`
/// means the price depends on quantity and is set at the point of service.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOffering {
    pub service_type: &'static str,
    pub name_en: &'static str,
    pub base_price: Option<u32>,
}

impl ServiceOffering {
    pub fn is_variable(&self) -> bool {
        self.base_price.is_none()
    }
}

const fn fixed(service_type: &'static str, name_en: &'static str, price: u32) -> ServiceOffering {
    ServiceOffering {
        service_type,
        name_en,
        base_price: Some(price),
    }
}

const fn variable(service_type: &'static str, name_en: &'static str) -> ServiceOffering {
    ServiceOffering {
        service_type,
        name_en,
        base_price: None,
    }
}

// Labels are what the mobile app sends as `serviceType`.
pub const CATALOG: [ServiceOffering; 13] = [
    fixed("بنشر متنقل", "mobile tire repair", 50),
    fixed("بطارية متنقلة", "mobile battery", 80),
    fixed("خلل كهربائي", "electrical fault", 100),
    fixed("إصلاح تكييف", "air conditioning repair", 120),
    variable("تغيير زيت", "oil change"),
    fixed("ميكانيكا", "mechanics", 150),
    fixed("مفتاح", "key service", 80),
    fixed("خلل آخر", "other fault", 100),
    variable("تغيير إطارات", "tire replacement"),
    fixed("فحص شامل", "full inspection", 120),
    fixed("طوارئ 24/7", "24/7 emergency", 150),
    fixed("فحص قبل الشراء", "pre-purchase inspection", 100),
    fixed("خدمة السحب", "towing", 150),
];

pub fn lookup(service_type: &str) -> Option<&'static ServiceOffering> {
    CATALOG.iter().find(|offering| offering.service_type == service_type)
}

/// Display text for a request's price: the stored price wins, then the
/// catalog price.
pub fn price_text(service_type: &str, stored_price: Option<f64>) -> String {
    if let Some(price) = stored_price {
        return format!("{price} SAR");
    }

    match lookup(service_type) {
        Some(offering) => match offering.base_price {
            Some(price) => format!("{price} SAR"),
            None => "by quantity".to_string(),
        },
        None => "unspecified".to_string(),
    }
}
