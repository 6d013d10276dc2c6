/*
 *  glyphs.rs
 *
 *  scout-panel - clawpi-scout indicator panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  8x8 dot-matrix glyphs, top row first, MSB = leftmost column
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

pub const GLYPH_SMILEY: [u8; 8] = [0x3c, 0x42, 0xa5, 0x81, 0xa5, 0x99, 0x42, 0x3c,];
pub const GLYPH_X: [u8; 8] = [0x81, 0x42, 0x24, 0x18, 0x18, 0x24, 0x42, 0x81,];
pub const GLYPH_CHECK: [u8; 8] = [0x00, 0x01, 0x02, 0x04, 0x88, 0x50, 0x20, 0x00,];
pub const GLYPH_EXCLAIM: [u8; 8] = [0x18, 0x18, 0x18, 0x18, 0x18, 0x00, 0x18, 0x18,];
pub const GLYPH_HEART: [u8; 8] = [0x00, 0x66, 0xff, 0xff, 0xff, 0x7e, 0x3c, 0x18,];
pub const GLYPH_BLANK: [u8; 8] = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,];

/// Named glyphs, in the order the wiring demo shows them
pub const DEMO_GLYPHS: [(&str, [u8; 8]); 5] = [
    ("smiley", GLYPH_SMILEY),
    ("X (down)", GLYPH_X),
    ("checkmark", GLYPH_CHECK),
    ("heart", GLYPH_HEART),
    ("exclamation", GLYPH_EXCLAIM),
];
