use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::PortfolioError;
use crate::types::{Currency, Ticker};
use crate::universe::esg::EsgScores;
use crate::PortfolioResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Static reference data for one listed asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub ticker: Ticker,
    /// Quotation currency of the listing.
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esg_score: Option<u32>,
}

/// Ticker-keyed registry of assets.
///
/// Injected into the currency normalizer so callers (and tests) can
/// supply any universe; `sustainable_universe()` is the shipped one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Asset>", into = "Vec<Asset>")]
pub struct AssetRegistry {
    assets: BTreeMap<Ticker, Asset>,
}

impl From<Vec<Asset>> for AssetRegistry {
    fn from(assets: Vec<Asset>) -> Self {
        let mut registry = AssetRegistry::default();
        for asset in assets {
            registry.insert(asset);
        }
        registry
    }
}

impl From<AssetRegistry> for Vec<Asset> {
    fn from(registry: AssetRegistry) -> Self {
        registry.assets.into_values().collect()
    }
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an asset, replacing any previous entry for the ticker.
    pub fn insert(&mut self, asset: Asset) {
        self.assets.insert(asset.ticker.clone(), asset);
    }

    /// Builder-style registration of a ticker and its currency.
    pub fn with(mut self, ticker: &str, currency: Currency) -> Self {
        self.insert(Asset {
            ticker: ticker.to_string(),
            currency,
            name: None,
            esg_score: None,
        });
        self
    }

    pub fn get(&self, ticker: &str) -> Option<&Asset> {
        self.assets.get(ticker)
    }

    /// Native currency of `ticker`. An unregistered ticker is a
    /// configuration error.
    pub fn currency_of(&self, ticker: &str) -> PortfolioResult<&Currency> {
        self.assets
            .get(ticker)
            .map(|a| &a.currency)
            .ok_or_else(|| PortfolioError::UnknownCurrency {
                ticker: ticker.to_string(),
            })
    }

    pub fn name_of(&self, ticker: &str) -> Option<&str> {
        self.assets.get(ticker).and_then(|a| a.name.as_deref())
    }

    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.assets.keys()
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    /// ESG scores of every asset that carries one.
    pub fn esg_scores(&self) -> EsgScores {
        self.assets
            .values()
            .filter_map(|a| a.esg_score.map(|s| (a.ticker.clone(), s)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// The 29 equities whose MSCI ESG rating improved by at least two
    /// notches, with their listing currencies.
    pub fn sustainable_universe() -> Self {
        let universe: [(&str, &str, Currency); 29] = [
            ("EQT", "EQT Corporation", Currency::USD),
            ("SAGA-B.ST", "AB Sagax", Currency::SEK),
            ("ACGBY", "Agricultural Bank of China Limited", Currency::USD),
            ("ATEYY", "Advantest Corporation", Currency::USD),
            ("2395.TW", "Advantech Co., Ltd.", Currency::TWD),
            ("ADM.L", "Admiral Group plc", Currency::GBP),
            ("AFL", "Aflac Incorporated", Currency::USD),
            ("ANET", "Arista Networks, Inc.", Currency::USD),
            ("ARES", "Ares Management Corporation", Currency::USD),
            ("ACGL", "Arch Capital Group Ltd.", Currency::USD),
            ("300999.SZ", "Yihai Kerry Arawana Holdings Co., Ltd.", Currency::CNY),
            ("AU", "AngloGold Ashanti plc", Currency::USD),
            ("AIR.PA", "Airbus SE", Currency::EUR),
            ("2618.TW", "EVA Airways Corporation", Currency::TWD),
            ("AON", "Aon plc", Currency::USD),
            ("A17U.SI", "CapitaLand Ascendas REIT", Currency::SGD),
            ("TEMN.SW", "Temenos AG", Currency::CHF),
            ("HOLN.SW", "Holcim Ltd", Currency::CHF),
            ("2802.T", "Ajinomoto Co., Inc.", Currency::JPY),
            ("MB.MI", "Mediobanca Banca di Credito Finanziario S.p.A.", Currency::EUR),
            ("BAMI.MI", "Banco BPM S.p.A.", Currency::EUR),
            ("PST.MI", "Poste Italiane S.p.A.", Currency::EUR),
            ("ALE.WA", "Allegro.eu SA", Currency::PLN),
            ("AVB", "AvalonBay Communities, Inc.", Currency::USD),
            ("AVY", "Avery Dennison Corporation", Currency::USD),
            ("2588.HK", "BOC Aviation Limited", Currency::HKD),
            ("INDIGO.NS", "InterGlobe Aviation Ltd", Currency::INR),
            ("9202.T", "ANA Holdings Inc.", Currency::JPY),
            ("KMI", "Kinder Morgan, Inc.", Currency::USD),
        ];

        let mut registry = AssetRegistry::new();
        for (ticker, name, currency) in universe {
            registry.insert(Asset {
                ticker: ticker.to_string(),
                currency,
                name: Some(name.to_string()),
                esg_score: None,
            });
        }
        registry
    }
}
