//! Labeled detail-table fields.

use std::fmt;

use crate::error::NormalizeError;
use crate::listing::Listing;
use crate::normalizer;

/// A row of the listing detail table, identified by its label cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingField {
    EngineDisplacement,
    BodyStyle,
    Passengers,
    FuelType,
    Transmission,
    Condition,
    Mileage,
    ExteriorColor,
    InteriorColor,
    Doors,
    TaxesPaid,
    Negotiable,
    AcceptsTradeIn,
    Province,
    DateEntered,
    BatteryRange,
    BatteryCapacity,
}

impl ListingField {
    /// Every field, in page order.
    pub const ALL: [ListingField; 17] = [
        Self::EngineDisplacement,
        Self::BodyStyle,
        Self::Passengers,
        Self::FuelType,
        Self::Transmission,
        Self::Condition,
        Self::Mileage,
        Self::ExteriorColor,
        Self::InteriorColor,
        Self::Doors,
        Self::TaxesPaid,
        Self::Negotiable,
        Self::AcceptsTradeIn,
        Self::Province,
        Self::DateEntered,
        Self::BatteryRange,
        Self::BatteryCapacity,
    ];

    /// Text of the label cell on the page.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::EngineDisplacement => "Cilindrada",
            Self::BodyStyle => "Estilo",
            Self::Passengers => "# de pasajeros",
            Self::FuelType => "Combustible",
            Self::Transmission => "Transmisión",
            Self::Condition => "Estado",
            Self::Mileage => "Kilometraje",
            Self::ExteriorColor => "Color exterior",
            Self::InteriorColor => "Color interior",
            Self::Doors => "# de puertas",
            Self::TaxesPaid => "Ya pagó impuestos",
            Self::Negotiable => "Precio negociable",
            Self::AcceptsTradeIn => "Se recibe vehículo",
            Self::Province => "Provincia",
            Self::DateEntered => "Fecha de ingreso",
            Self::BatteryRange => "Autonomía",
            Self::BatteryCapacity => "Batería",
        }
    }

    /// Normalize `raw` and store it on `listing`.
    ///
    /// On error the listing is left untouched.
    pub fn apply(self, raw: &str, listing: &mut Listing) -> Result<(), NormalizeError> {
        match self {
            Self::EngineDisplacement => {
                listing.engine_displacement = Some(normalizer::engine_displacement(raw)?);
            }
            Self::BodyStyle => listing.body_style = Some(normalizer::text(raw)?),
            Self::Passengers => listing.passengers = Some(normalizer::count(raw)?),
            Self::FuelType => listing.fuel_type = Some(normalizer::text(raw)?),
            Self::Transmission => listing.transmission = Some(normalizer::text(raw)?),
            Self::Condition => listing.condition = Some(normalizer::text(raw)?),
            Self::Mileage => listing.mileage_km = Some(normalizer::distance_km(raw)?),
            Self::ExteriorColor => listing.exterior_color = Some(normalizer::text(raw)?),
            Self::InteriorColor => listing.interior_color = Some(normalizer::text(raw)?),
            Self::Doors => listing.doors = Some(normalizer::count(raw)?),
            Self::TaxesPaid => listing.taxes_paid = Some(normalizer::yes_no(raw)?),
            Self::Negotiable => listing.negotiable = Some(normalizer::yes_no(raw)?),
            Self::AcceptsTradeIn => listing.accepts_trade_in = Some(normalizer::yes_no(raw)?),
            Self::Province => listing.province = Some(normalizer::text(raw)?),
            Self::DateEntered => listing.date_entered = Some(normalizer::entry_date(raw)?),
            Self::BatteryRange => listing.battery_range_km = Some(normalizer::distance_km(raw)?),
            Self::BatteryCapacity => {
                listing.battery_capacity = Some(normalizer::battery_capacity(raw)?);
            }
        }
        Ok(())
    }
}

impl fmt::Display for ListingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
