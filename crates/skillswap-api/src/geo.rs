/// Great-circle distance in kilometers (haversine), used by the skill
/// listing's radius filter.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance() {
        assert!(haversine_km(52.52, 13.405, 52.52, 13.405) < 1e-9);
    }

    #[test]
    fn berlin_to_hamburg_roughly_255km() {
        let d = haversine_km(52.52, 13.405, 53.551, 9.994);
        assert!((d - 255.0).abs() < 10.0, "got {d}");
    }
}
