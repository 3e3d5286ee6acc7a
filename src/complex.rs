use std::{f64::consts::E, fmt, ops::*};

/// The tower's complex number type
///
/// Stored in Cartesian form. The `@` literal notation and the printed form
/// are polar with the angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    /// The real part
    pub re: f64,
    /// The imaginary part
    pub im: f64,
}

impl Complex {
    /// The complex number 0 + 0i
    pub const ZERO: Self = Self { re: 0.0, im: 0.0 };
    /// The complex number 1 + 0i
    pub const ONE: Self = Self { re: 1.0, im: 0.0 };
    /// The complex number 0 + 1i
    pub const I: Self = Self { re: 0.0, im: 1.0 };
    /// Create a new complex number
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
    /// Get the magnitude of a complex number
    pub fn abs(self) -> f64 {
        self.re.hypot(self.im)
    }
    /// Get the complex conjugate
    pub fn conj(self) -> Self {
        Self::new(self.re, -self.im)
    }
    /// Get the sign of a complex number, a unit vector
    pub fn signum(self) -> Self {
        let mag = self.abs();
        if mag == 0.0 {
            Self::ZERO
        } else {
            self / mag
        }
    }
    /// Calculate the principal argument of the complex number
    pub fn arg(self) -> f64 {
        self.im.atan2(self.re)
    }
    /// Convert a complex number to polar coordinates
    pub fn to_polar(self) -> (f64, f64) {
        (self.abs(), self.arg())
    }
    /// Convert polar coordinates to a complex number
    pub fn from_polar(r: f64, theta: f64) -> Self {
        r * Self::new(theta.cos(), theta.sin())
    }
    /// The angle of the polar form in degrees, normalized to `[0, 360)`
    ///
    /// Angles within rounding noise of an integer snap to it, so that
    /// `1J1` prints as `1.4142135623730951@45`.
    pub fn arg_deg(self) -> f64 {
        let mut deg = self.arg().to_degrees();
        let rounded = deg.round();
        if (deg - rounded).abs() < 1e-9 {
            deg = rounded;
        }
        if deg < 0.0 {
            deg += 360.0;
        }
        if deg >= 360.0 {
            deg -= 360.0;
        }
        // A snapped angle may be the negative zero
        deg + 0.0
    }
    /// Build a complex number from a magnitude and an angle in degrees
    pub fn from_polar_deg(r: f64, deg: f64) -> Self {
        Self::from_polar(r, deg.to_radians())
    }
    /// Raise a complex number to a complex power
    pub fn powc(self, power: impl Into<Self>) -> Self {
        let power = power.into();
        if power.im == 0.0 {
            if self.im == 0.0 && (self.re >= 0.0 || power.re.fract() == 0.0) {
                return Self::new(self.re.powf(power.re), 0.0);
            }
            if power.re == 0.0 {
                return Self::ONE;
            }
        }
        let (r, theta) = self.to_polar();
        ((Self::from(r.ln()) + Self::I * Self::from(theta)) * power).exp()
    }
    /// Calculate the exponential of a complex number
    pub fn exp(self) -> Self {
        Self::from_polar(E.powf(self.re), self.im)
    }
    /// Calculate the natural logarithm of a complex number
    pub fn ln(self) -> Self {
        let (r, theta) = self.to_polar();
        Self::new(r.ln(), theta)
    }
    /// Calculate the logarithm of a complex number in the given base
    pub fn log(self, base: impl Into<Self>) -> Self {
        let base = base.into();
        self.ln() / base.ln()
    }
    /// Compare for equality within a tolerance
    pub fn approx_eq(self, other: Self, tol: f64) -> bool {
        (self - other).abs() <= tol * self.abs().max(other.abs()).max(1.0)
    }
}

impl From<f64> for Complex {
    fn from(re: f64) -> Self {
        Self { re, im: 0.0 }
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.abs(), self.arg_deg())
    }
}

impl Add for Complex {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }
}

impl Sub for Complex {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            re: self.re - rhs.re,
            im: self.im - rhs.im,
        }
    }
}

impl Mul for Complex {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}

impl Mul<Complex> for f64 {
    type Output = Complex;
    fn mul(self, rhs: Complex) -> Self::Output {
        Complex {
            re: self * rhs.re,
            im: self * rhs.im,
        }
    }
}

impl Div for Complex {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        let denom = rhs.re * rhs.re + rhs.im * rhs.im;
        Self {
            re: (self.re * rhs.re + self.im * rhs.im) / denom,
            im: (self.im * rhs.re - self.re * rhs.im) / denom,
        }
    }
}

impl Div<f64> for Complex {
    type Output = Self;
    fn div(self, rhs: f64) -> Self::Output {
        Self {
            re: self.re / rhs,
            im: self.im / rhs,
        }
    }
}

impl Neg for Complex {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self {
            re: -self.re,
            im: -self.im,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polar_degrees() {
        let z = Complex::new(1.0, 1.0);
        assert_eq!(z.arg_deg(), 45.0);
        let z = Complex::from_polar_deg(1.0, 300.0);
        assert!(z.re > 0.0 && z.im < 0.0);
        assert_eq!(z.arg_deg(), 300.0);
        let sum = Complex::from_polar_deg(1.0, 60.0) + Complex::from_polar_deg(1.0, 300.0);
        assert_eq!(sum.arg_deg(), 0.0);
        assert!((sum.abs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn arithmetic() {
        let a = Complex::new(1.0, 2.0);
        let b = Complex::new(3.0, -1.0);
        assert_eq!(a * b, Complex::new(5.0, 5.0));
        assert_eq!((a * b) / b, a);
        assert_eq!(a + b - b, a);
        assert_eq!(Complex::from(2.0).powc(Complex::from(10.0)).re, 1024.0);
    }
}
