use serde::Serialize;

/// A purchasable credit pack. Purchases are simulated.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreditPlan {
    pub id: &'static str,
    pub name: &'static str,
    pub credits: i64,
    pub price_inr: i64,
    pub popular: bool,
}

pub static CREDIT_PLANS: [CreditPlan; 3] = [
    CreditPlan {
        id: "starter",
        name: "Starter Pack",
        credits: 25,
        price_inr: 799,
        popular: false,
    },
    CreditPlan {
        id: "popular",
        name: "Popular Choice",
        credits: 100,
        price_inr: 2499,
        popular: true,
    },
    CreditPlan {
        id: "premium",
        name: "Premium Pack",
        credits: 250,
        price_inr: 4999,
        popular: false,
    },
];

pub fn find_plan(id: &str) -> Option<&'static CreditPlan> {
    CREDIT_PLANS.iter().find(|p| p.id == id)
}
