//! Transverse Mercator on the WGS84 ellipsoid using Krüger's series to sixth
//! order in the third flattening (Karney 2011). Accurate to well under a
//! millimetre within a UTM zone.

use crate::constants::{WGS84_FLATTENING, WGS84_SEMI_MAJOR_AXIS_M};

#[derive(Debug, Clone)]
pub struct TransverseMercator {
    /// central meridian, degrees
    lon0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
    /// rectifying radius
    a_rect: f64,
    e: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
}

impl TransverseMercator {
    pub fn new(lon0: f64, k0: f64, false_easting: f64, false_northing: f64) -> Self {
        let f = WGS84_FLATTENING;
        let n = f / (2.0 - f);
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        let a_rect = WGS84_SEMI_MAJOR_AXIS_M / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);

        let alpha = [
            n / 2.0 - 2.0 / 3.0 * n2 + 5.0 / 16.0 * n3 + 41.0 / 180.0 * n4 - 127.0 / 288.0 * n5
                + 7891.0 / 37800.0 * n6,
            13.0 / 48.0 * n2 - 3.0 / 5.0 * n3 + 557.0 / 1440.0 * n4 + 281.0 / 630.0 * n5
                - 1983433.0 / 1935360.0 * n6,
            61.0 / 240.0 * n3 - 103.0 / 140.0 * n4 + 15061.0 / 26880.0 * n5
                + 167603.0 / 181440.0 * n6,
            49561.0 / 161280.0 * n4 - 179.0 / 168.0 * n5 + 6601661.0 / 7257600.0 * n6,
            34729.0 / 80640.0 * n5 - 3418889.0 / 1995840.0 * n6,
            212378941.0 / 319334400.0 * n6,
        ];
        let beta = [
            n / 2.0 - 2.0 / 3.0 * n2 + 37.0 / 96.0 * n3 - 1.0 / 360.0 * n4 - 81.0 / 512.0 * n5
                + 96199.0 / 604800.0 * n6,
            1.0 / 48.0 * n2 + 1.0 / 15.0 * n3 - 437.0 / 1440.0 * n4 + 46.0 / 105.0 * n5
                - 1118711.0 / 3870720.0 * n6,
            17.0 / 480.0 * n3 - 37.0 / 840.0 * n4 - 209.0 / 4480.0 * n5 + 5569.0 / 90720.0 * n6,
            4397.0 / 161280.0 * n4 - 11.0 / 504.0 * n5 - 830251.0 / 7257600.0 * n6,
            4583.0 / 161280.0 * n5 - 108847.0 / 3991680.0 * n6,
            20648693.0 / 638668800.0 * n6,
        ];

        Self {
            lon0,
            k0,
            false_easting,
            false_northing,
            a_rect,
            e: (f * (2.0 - f)).sqrt(),
            alpha,
            beta,
        }
    }

    /// (lng, lat) degrees to (easting, northing) metres
    pub fn forward(&self, lng: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let lam = normalize_lon(lng - self.lon0).to_radians();

        let tau = phi.tan();
        let tau_p = self.conformal_tau(tau);

        let xi_p = tau_p.atan2(lam.cos());
        let eta_p = (lam.sin() / tau_p.hypot(lam.cos())).asinh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, alpha) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi += alpha * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += alpha * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        (
            self.false_easting + self.k0 * self.a_rect * eta,
            self.false_northing + self.k0 * self.a_rect * xi,
        )
    }

    /// (easting, northing) metres to (lng, lat) degrees
    pub fn inverse(&self, easting: f64, northing: f64) -> (f64, f64) {
        let xi = (northing - self.false_northing) / (self.k0 * self.a_rect);
        let eta = (easting - self.false_easting) / (self.k0 * self.a_rect);

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, beta) in self.beta.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi_p -= beta * (k * xi).sin() * (k * eta).cosh();
            eta_p -= beta * (k * xi).cos() * (k * eta).sinh();
        }

        let tau_p = xi_p.sin() / eta_p.sinh().hypot(xi_p.cos());
        let lam = eta_p.sinh().atan2(xi_p.cos());
        let tau = self.geographic_tau(tau_p);

        (
            normalize_lon(self.lon0 + lam.to_degrees()),
            tau.atan().to_degrees(),
        )
    }

    /// tan of the conformal latitude from tan of the geographic latitude
    fn conformal_tau(&self, tau: f64) -> f64 {
        let tau1 = tau.hypot(1.0);
        let sigma = (self.e * (self.e * tau / tau1).atanh()).sinh();
        tau * sigma.hypot(1.0) - sigma * tau1
    }

    /// Newton iteration inverting `conformal_tau`
    fn geographic_tau(&self, tau_p: f64) -> f64 {
        let e2m = 1.0 - self.e * self.e;
        let mut tau = tau_p / e2m;
        for _ in 0..8 {
            let tau_pa = self.conformal_tau(tau);
            let dtau = (tau_p - tau_pa) * (1.0 + e2m * tau * tau)
                / (e2m * tau.hypot(1.0) * tau_pa.hypot(1.0));
            tau += dtau;
            if dtau.abs() < 1e-15 * tau.abs().max(1.0) {
                break;
            }
        }
        tau
    }
}

fn normalize_lon(lng: f64) -> f64 {
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lng > 0.0 { 180.0 } else { wrapped }
}
