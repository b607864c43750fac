//! 8x8 inverse DCT.
//!
//! Two interchangeable implementations: an exact fixed-point lifting network
//! used on the decode path, and a scaled floating-point factorization kept as
//! a precision reference. Both are separable row/column transforms.

/// Input scaling applied around each 1-D pass of the fixed-point transform.
pub const COEFF_SHIFT: u32 = 4;

/// Strength-reduced form of `a / (1 << b)` that rounds toward zero for
/// negative values. Not valid for `b == 0`.
#[inline]
fn unbiased_rshift32(a: i32, b: u32) -> i32 {
    (((a as u32 >> (32 - b)) as i32).wrapping_add(a)) >> b
}

/// Embedded 2-point orthonormal Type-II iDCT.
#[inline]
fn idct2(t0: &mut i32, t1: &mut i32) {
    // 3393/8192 ~= Tan[pi/8] ~= 0.414213562373095
    *t0 += (*t1 * 3393 + 4096) >> 13;
    // 5793/8192 ~= Sin[pi/4] ~= 0.707106781186547
    *t1 -= (*t0 * 5793 + 4096) >> 13;
    // 13573/32768 ~= Tan[pi/8] ~= 0.414213562373095
    *t0 += (*t1 * 13573 + 16384) >> 15;
}

/// Embedded 2-point orthonormal Type-IV iDST.
#[inline]
fn idst2(t0: &mut i32, t1: &mut i32) {
    // 10947/16384 ~= Tan[3*Pi/16] ~= 0.668178637919299
    *t0 += (*t1 * 10947 + 8192) >> 14;
    // 473/512 ~= Sin[3*Pi/8] ~= 0.923879532511287
    *t1 -= (*t0 * 473 + 256) >> 9;
    // 10947/16384 ~= Tan[3*Pi/16] ~= 0.668178637919299
    *t0 += (*t1 * 10947 + 8192) >> 14;
}

/// Embedded 4-point asymmetric Type-II iDCT. Returns (t1h, t3h).
#[inline]
fn idct4_asym(t0: &mut i32, t2: &mut i32, t1: &mut i32, t3: &mut i32) -> (i32, i32) {
    idst2(t3, t2);
    idct2(t0, t1);
    *t1 = *t2 - *t1;
    let t1h = unbiased_rshift32(*t1, 1);
    *t2 = t1h - *t2;
    *t3 = *t0 - *t3;
    let t3h = unbiased_rshift32(*t3, 1);
    *t0 -= t3h;
    (t1h, t3h)
}

/// Embedded 4-point asymmetric Type-IV iDST. Returns t0h.
#[inline]
fn idst4_asym(t0: &mut i32, t2: &mut i32, t1: &mut i32, t3: &mut i32) -> i32 {
    // 8757/16384 ~= Tan[5*Pi/32] ~= 0.534511135950792
    *t1 -= (*t2 * 8757 + 8192) >> 14;
    // 6811/8192 ~= Sin[5*Pi/16] ~= 0.831469612302545
    *t2 += (*t1 * 6811 + 4096) >> 13;
    // 8757/16384 ~= Tan[5*Pi/32] ~= 0.534511135950792
    *t1 -= (*t2 * 8757 + 8192) >> 14;
    // 6723/8192 ~= Tan[7*Pi/32] ~= 0.820678790828660
    *t3 -= (*t0 * 6723 + 4096) >> 13;
    // 8035/8192 ~= Sin[7*Pi/16] ~= 0.980785280403230
    *t0 += (*t3 * 8035 + 4096) >> 13;
    // 6723/8192 ~= Tan[7*Pi/32] ~= 0.820678790828660
    *t3 -= (*t0 * 6723 + 4096) >> 13;
    *t0 += *t2;
    let t0h = unbiased_rshift32(*t0, 1);
    *t2 = t0h - *t2;
    *t1 += *t3;
    *t3 -= unbiased_rshift32(*t1, 1);
    // -19195/32768 ~= Tan[Pi/8] - Tan[Pi/4] ~= -0.585786437626905
    *t1 -= (*t2 * 19195 + 16384) >> 15;
    // 11585/16384 ~= Sin[Pi/4] ~= 0.707106781186548
    *t2 -= (*t1 * 11585 + 8192) >> 14;
    // 7489/8192 ~= Tan[Pi/8] + Tan[Pi/4]/2 ~= 0.914213562373095
    *t1 += (*t2 * 7489 + 4096) >> 13;
    t0h
}

/// Embedded 8-point orthonormal Type-II iDCT.
#[allow(clippy::too_many_arguments)]
#[inline]
fn idct8(
    r0: &mut i32,
    r4: &mut i32,
    r2: &mut i32,
    r6: &mut i32,
    r1: &mut i32,
    r5: &mut i32,
    r3: &mut i32,
    r7: &mut i32,
) {
    let r7h = idst4_asym(r7, r5, r6, r4);
    let (r1h, r3h) = idct4_asym(r0, r2, r1, r3);
    *r0 += r7h;
    *r7 = *r0 - *r7;
    *r6 = r1h - *r6;
    *r1 -= *r6;
    let r5h = unbiased_rshift32(*r5, 1);
    *r2 += r5h;
    *r5 = *r2 - *r5;
    *r4 = r3h - *r4;
    *r3 -= *r4;
}

/// One fixed-point 1-D pass: transforms `y` and scatters the result into
/// `x[0]`, `x[stride]`, ..., `x[7 * stride]`.
fn idct8_span(x: &mut [i32], stride: usize, y: &[i32; 8]) {
    let mut t0 = y[0] << COEFF_SHIFT;
    let mut t4 = y[1] << COEFF_SHIFT;
    let mut t2 = y[2] << COEFF_SHIFT;
    let mut t6 = y[3] << COEFF_SHIFT;
    let mut t1 = y[4] << COEFF_SHIFT;
    let mut t5 = y[5] << COEFF_SHIFT;
    let mut t3 = y[6] << COEFF_SHIFT;
    let mut t7 = y[7] << COEFF_SHIFT;
    idct8(
        &mut t0, &mut t4, &mut t2, &mut t6, &mut t1, &mut t5, &mut t3, &mut t7,
    );
    x[0] = unbiased_rshift32(t0, COEFF_SHIFT);
    x[stride] = unbiased_rshift32(t1, COEFF_SHIFT);
    x[2 * stride] = unbiased_rshift32(t2, COEFF_SHIFT);
    x[3 * stride] = unbiased_rshift32(t3, COEFF_SHIFT);
    x[4 * stride] = unbiased_rshift32(t4, COEFF_SHIFT);
    x[5 * stride] = unbiased_rshift32(t5, COEFF_SHIFT);
    x[6 * stride] = unbiased_rshift32(t6, COEFF_SHIFT);
    x[7 * stride] = unbiased_rshift32(t7, COEFF_SHIFT);
}

/// In-place fixed-point 8x8 inverse DCT, rows then columns. This is the
/// runtime decode path.
pub fn idct8x8(block: &mut [i32; 64]) {
    let mut z = [0i32; 64];
    for i in 0..8 {
        let row = core::array::from_fn(|j| block[8 * i + j]);
        idct8_span(&mut z[i..], 8, &row);
    }
    for i in 0..8 {
        let row = core::array::from_fn(|j| z[8 * i + j]);
        idct8_span(&mut block[i..], 8, &row);
    }
}

/// One floating-point 1-D pass of the scaled iDCT/iDST factorization.
fn real_idct8_span(x: &mut [f32], stride: usize, y: &[f32; 8]) {
    let t0 = y[0];
    let u4 = y[1];
    let t2 = y[2];
    let u6 = y[3];
    let t1 = y[4];
    let u5 = y[5];
    let t3 = y[6];
    let u7 = y[7];
    // Embedded scaled inverse 4-point Type-II DCT.
    let u0 = t0 + t1;
    let u1 = t0 - t1;
    let u3 = t2 + t3;
    let u2 = (t2 - t3) * 1.414_213_562_373_095_f32 - u3;
    let t0 = u0 + u3;
    let t3 = u0 - u3;
    let t1 = u1 + u2;
    let t2 = u1 - u2;
    // Embedded scaled inverse 4-point Type-IV DST.
    let t5 = u5 + u6;
    let t6 = u5 - u6;
    let t7 = u4 + u7;
    let t4 = u4 - u7;
    let u7 = t7 + t5;
    let u5 = (t7 - t5) * 1.414_213_562_373_095_f32;
    let u8 = (t4 + t6) * 1.847_759_065_022_573_5_f32;
    let u4 = u8 - t4 * 1.082_392_200_292_394_f32;
    let u6 = u8 - t6 * 2.613_125_929_752_753_f32;
    let t7 = u7;
    let t6 = t7 - u6;
    let t5 = t6 + u5;
    let t4 = t5 - u4;
    // Butterflies.
    x[0] = t0 + t7;
    x[7 * stride] = t0 - t7;
    x[6 * stride] = t1 + t6;
    x[stride] = t1 - t6;
    x[2 * stride] = t2 + t5;
    x[5 * stride] = t2 - t5;
    x[4 * stride] = t3 + t4;
    x[3 * stride] = t3 - t4;
}

/// Per-row/column scales of the orthonormal DCT-II basis, folded into the
/// input so the factorized passes can run scale-free.
const REAL_IDCT8_SCALES: [f32; 8] = [
    0.353_553_390_593_273_76,
    0.490_392_640_201_615_2,
    0.461_939_766_255_643_37,
    0.415_734_806_151_272_6,
    0.353_553_390_593_273_76,
    0.277_785_116_509_801_1,
    0.191_341_716_182_544_89,
    0.097_545_161_008_064_13,
];

/// In-place floating-point 8x8 inverse DCT used as the precision reference.
/// Output values are floored after a +0.5 bias folded into the DC term of
/// the second pass (round half up).
pub fn idct8x8_real(block: &mut [i32; 64]) {
    let mut t = [0f32; 64];
    for j in 0..8 {
        for i in 0..8 {
            t[j * 8 + i] =
                block[j * 8 + i] as f32 * REAL_IDCT8_SCALES[j] * REAL_IDCT8_SCALES[i];
        }
    }
    let mut z = [0f32; 64];
    for i in 0..8 {
        let row = core::array::from_fn(|j| t[8 * i + j]);
        real_idct8_span(&mut z[i..], 8, &row);
    }
    for i in 0..8 {
        z[8 * i] += 0.5;
        let row = core::array::from_fn(|j| z[8 * i + j]);
        real_idct8_span(&mut t[i..], 8, &row);
    }
    for j in 0..8 {
        for i in 0..8 {
            block[j * 8 + i] = t[j * 8 + i].floor() as i32;
        }
    }
}
