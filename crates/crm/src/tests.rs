use super::clut::{clut_origin, fingerprint, psx_color, read_palette, CHROMA_KEY};
use super::*;
use common::collect_files_recursive;
use image::Rgba;
use proptest::prelude::*;
use srmodel::geometry::Geometry;
use srmodel::material::DEFAULT_COLOR;
use srmodel::{GeometrySource, Material, Model, Platform, Polygon};
use std::path::{Path, PathBuf};

const PLANE_WIDTH: usize = 256;
const PLANE_HEIGHT: usize = 258;
const CLUT_A: u16 = 256 << 6;
const CLUT_B: u16 = 257 << 6;

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

fn crm_test_files() -> Vec<PathBuf> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("testdata");
    let mut files = Vec::new();
    collect_files_recursive(&root, &mut files);
    files.sort();
    files
        .into_iter()
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("crm"))
        })
        .collect()
}

/// VRAM plane under construction: two pages side by side and two CLUT rows
/// below them.
struct Plane {
    width: usize,
    height: usize,
    words: Vec<u16>,
}

impl Plane {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            words: vec![0; width * height],
        }
    }

    fn standard() -> Self {
        let mut plane = Self::new(PLANE_WIDTH, PLANE_HEIGHT);
        plane.set_color(CLUT_A, 1, 0x001F);
        plane.set_color(CLUT_B, 1, 0x03E0);
        plane
    }

    fn set_word(&mut self, x: usize, y: usize, word: u16) {
        self.words[y * self.width + x] = word;
    }

    fn set_texel(&mut self, page: usize, x: usize, y: usize, index: u8) {
        let per_row = self.width / PAGE_WORDS;
        let wx = (page % per_row) * PAGE_WORDS + x / 2;
        let wy = (page / per_row) * TEXTURE_SIZE as usize + y;
        let [mut lo, mut hi] = self.words[wy * self.width + wx].to_le_bytes();
        if x % 2 == 0 {
            lo = index;
        } else {
            hi = index;
        }
        self.set_word(wx, wy, u16::from_le_bytes([lo, hi]));
    }

    fn fill_page(&mut self, page: usize, index: u8) {
        for y in 0..TEXTURE_SIZE as usize {
            for x in 0..TEXTURE_SIZE as usize {
                self.set_texel(page, x, y, index);
            }
        }
    }

    fn set_color(&mut self, clut: u16, index: usize, word: u16) {
        let (x, y) = clut_origin(clut);
        self.set_word(x + index, y, word);
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; 28];
        bytes.extend_from_slice(&(self.width as i32).to_le_bytes());
        bytes.extend_from_slice(&(self.height as i32).to_le_bytes());
        for word in &self.words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    fn crm(&self) -> CrmFile {
        parse_crm(&self.to_bytes()).expect("synthetic CRM must parse")
    }
}

fn quad(u0: u8, v0: u8, size: u8) -> [[u8; 2]; 3] {
    [[u0, v0], [u0 + size, v0], [u0, v0 + size]]
}

fn texture_use(texture_id: u16, clut: u16, texels: [[u8; 2]; 3], visible: bool) -> TextureUse {
    TextureUse {
        texture_id,
        clut,
        texels,
        color: DEFAULT_COLOR,
        visible,
        texture_used: visible,
    }
}

fn exact() -> TextureOptions {
    TextureOptions {
        quantize_bounds: false,
        ..TextureOptions::default()
    }
}

#[test]
fn parse_crm_reads_header_and_plane() {
    let mut plane = Plane::new(PLANE_WIDTH, PLANE_HEIGHT);
    plane.set_word(3, 2, 0xBEEF);
    let crm = plane.crm();
    assert_eq!(crm.width, PLANE_WIDTH);
    assert_eq!(crm.height, PLANE_HEIGHT);
    assert_eq!(crm.words.len(), PLANE_WIDTH * PLANE_HEIGHT);
    assert_eq!(crm.word(3, 2), Some(0xBEEF));
    assert_eq!(crm.word(PLANE_WIDTH, 0), None);
    assert_eq!(crm.word(0, PLANE_HEIGHT), None);
    assert_eq!(crm.page_count(), 2);
}

#[test]
fn parse_crm_rejects_negative_dimensions() {
    let mut bytes = Plane::new(1, 1).to_bytes();
    bytes[28..32].copy_from_slice(&(-4i32).to_le_bytes());
    assert!(matches!(
        parse_crm(&bytes),
        Err(Error::InvalidDimensions { width: -4, .. })
    ));
}

#[test]
fn parse_crm_rejects_truncated_pixels() {
    let mut bytes = Plane::new(16, 16).to_bytes();
    bytes.truncate(bytes.len() - 2);
    assert!(matches!(
        parse_crm(&bytes),
        Err(Error::TruncatedPixels { needed: 512, available: 510 })
    ));
}

#[test]
fn parse_crm_rejects_short_header() {
    assert!(matches!(parse_crm(&[0u8; 30]), Err(Error::Read(_))));
}

#[test]
fn page_cut_splits_words_low_byte_first() {
    let mut plane = Plane::new(PLANE_WIDTH, PLANE_HEIGHT);
    plane.set_word(0, 0, 0xBBAA);
    plane.set_word(PAGE_WORDS, 5, 0x2211);
    let crm = plane.crm();

    let first = TexturePage::cut(&crm, 0);
    assert_eq!(first.pixel(0, 0), 0xAA);
    assert_eq!(first.pixel(1, 0), 0xBB);
    assert_eq!(first.pixels().len(), 256 * 256);

    let second = TexturePage::cut(&crm, 1);
    assert_eq!(second.pixel(0, 5), 0x11);
    assert_eq!(second.pixel(1, 5), 0x22);
    assert_eq!(second.pixel(0, 0), 0);
}

#[test]
fn psx_colors_expand_to_eight_bits() {
    assert_eq!(psx_color(0x0000), Rgba([0, 0, 0, 0]));
    assert_eq!(psx_color(0x7FFF), Rgba([255, 255, 255, 255]));
    assert_eq!(psx_color(0x001F), RED);
    assert_eq!(psx_color(0x03E0), GREEN);
    assert_eq!(psx_color(0x7C00), Rgba([0, 0, 255, 255]));
    assert_eq!(psx_color(0x0001), Rgba([8, 0, 0, 255]));
    // The top bit carries no color.
    assert_eq!(psx_color(0x8000), Rgba([0, 0, 0, 255]));
}

#[test]
fn clut_origin_uses_sixteen_word_columns() {
    assert_eq!(clut_origin(0x0000), (0, 0));
    assert_eq!(clut_origin(0x0001), (16, 0));
    assert_eq!(clut_origin(CLUT_B | 0x3F), (1008, 257));
}

#[test]
fn fingerprint_packs_alpha_and_channels() {
    assert_eq!(fingerprint(Rgba([1, 2, 3, 4])), 0x0401_0203_0000_0000);
    assert_ne!(fingerprint(CHROMA_KEY), fingerprint(Rgba([128, 128, 128, 255])));
}

#[test]
fn palette_outside_plane_falls_back_to_greyscale() {
    let crm = Plane::standard().crm();
    assert!(read_palette(&crm, CLUT_A).is_some());
    assert!(read_palette(&crm, CLUT_A | 1).is_none());
    assert!(read_palette(&crm, 300 << 6).is_none());

    let mut pages = TexturePages::new(&crm, false);
    let palette = pages.palette(CLUT_A | 1);
    assert_eq!(palette[7], Rgba([7, 7, 7, 255]));
    assert_eq!(pages.palette(CLUT_A)[1], RED);
}

#[test]
fn uv_rect_spans_the_corner_texels() {
    let texels = [[17, 3], [40, 20], [30, 9]];
    assert_eq!(
        uv_rect(&texels, false),
        UvRect {
            u_min: 17,
            u_max: 40,
            v_min: 3,
            v_max: 20
        }
    );
    assert_eq!(
        uv_rect(&texels, true),
        UvRect {
            u_min: 16,
            u_max: 48,
            v_min: 0,
            v_max: 32
        }
    );
}

#[test]
fn quantized_rect_is_clamped_to_the_page() {
    let rect = uv_rect(&[[250, 250], [255, 255], [251, 252]], true);
    assert_eq!(rect.u_min, 240);
    assert_eq!(rect.u_max, 256);
    assert_eq!(rect.v_max, 256);

    let degenerate = uv_rect(&[[5, 5]; 3], false);
    assert!(degenerate.is_empty());
    assert!(!uv_rect(&[[5, 5]; 3], true).is_empty());
}

#[test]
fn visible_polygon_overrides_invisible_owner() {
    let mut plane = Plane::standard();
    plane.fill_page(0, 1);
    let crm = plane.crm();
    let uses = [
        texture_use(0, CLUT_A, quad(0, 0, 16), false),
        texture_use(0, CLUT_B, quad(0, 0, 16), true),
    ];
    let set = build_textures(&crm, &uses, &exact());
    let page = set.texture(0).expect("page");
    assert_eq!(*page.get_pixel(0, 0), GREEN);
    assert_eq!(*page.get_pixel(15, 15), GREEN);
}

#[test]
fn invisible_polygon_cannot_take_claimed_texels() {
    let mut plane = Plane::standard();
    plane.fill_page(0, 1);
    let crm = plane.crm();
    let uses = [
        texture_use(0, CLUT_A, quad(0, 0, 16), true),
        texture_use(0, CLUT_B, quad(0, 0, 16), false),
    ];
    let set = build_textures(&crm, &uses, &exact());
    assert_eq!(*set.texture(0).expect("page").get_pixel(8, 8), RED);
}

#[test]
fn unclaimed_texels_use_most_common_clut() {
    let mut plane = Plane::standard();
    plane.fill_page(0, 1);
    let crm = plane.crm();
    let uses = [
        texture_use(0, CLUT_B, quad(0, 0, 16), true),
        texture_use(0, CLUT_B, quad(16, 0, 16), true),
        texture_use(0, CLUT_A, quad(32, 0, 16), true),
    ];
    let set = build_textures(&crm, &uses, &exact());
    let page = set.texture(0).expect("page");
    assert_eq!(*page.get_pixel(40, 8), RED);
    assert_eq!(*page.get_pixel(100, 100), GREEN);
}

#[test]
fn common_clut_tie_prefers_lowest_id() {
    let mut plane = Plane::standard();
    plane.fill_page(0, 1);
    let crm = plane.crm();
    let uses = [
        texture_use(0, CLUT_B, quad(0, 0, 16), true),
        texture_use(0, CLUT_A, quad(32, 0, 16), true),
    ];
    let set = build_textures(&crm, &uses, &exact());
    assert_eq!(*set.texture(0).expect("page").get_pixel(100, 100), RED);

    let mut pages = TexturePages::new(&crm, false);
    for texture_use in &uses {
        assert!(pages.register_clut(usize::from(texture_use.texture_id), texture_use.clut));
    }
    let page = pages.get(0).expect("page");
    assert_eq!(page.most_common_clut(), Some(CLUT_A));
    assert_eq!(page.ref_count(CLUT_B), 1);
}

#[test]
fn page_without_references_borrows_global_clut() {
    let mut plane = Plane::standard();
    plane.fill_page(0, 1);
    plane.fill_page(1, 1);
    let crm = plane.crm();
    let uses = [texture_use(0, CLUT_B, quad(0, 0, 16), true)];

    let set = build_textures(&crm, &uses, &exact());
    assert_eq!(*set.texture(1).expect("page").get_pixel(10, 10), GREEN);

    let greyscale = TextureOptions {
        always_use_greyscale_for_missing_palettes: true,
        ..exact()
    };
    let set = build_textures(&crm, &uses, &greyscale);
    assert_eq!(
        *set.texture(1).expect("page").get_pixel(10, 10),
        Rgba([1, 1, 1, 255])
    );
}

#[test]
fn no_references_at_all_gives_greyscale() {
    let mut plane = Plane::standard();
    plane.fill_page(1, 9);
    let crm = plane.crm();
    let set = build_textures(&crm, &[], &TextureOptions::default());
    assert_eq!(set.len(), 2);
    assert_eq!(
        *set.texture(1).expect("page").get_pixel(0, 0),
        Rgba([9, 9, 9, 255])
    );
}

#[test]
fn transparent_page_is_unhidden_on_request() {
    let mut plane = Plane::standard();
    plane.fill_page(0, 1);
    let crm = plane.crm();
    let uses = [texture_use(0, CLUT_A, quad(0, 0, 16), true)];

    let set = build_textures(&crm, &uses, &exact());
    assert_eq!(set.texture(1).expect("page").get_pixel(3, 3)[3], 0);

    let unhide = TextureOptions {
        unhide_completely_transparent_textures: true,
        ..exact()
    };
    let set = build_textures(&crm, &uses, &unhide);
    assert_eq!(set.texture(1).expect("page").get_pixel(3, 3)[3], 128);
    assert_eq!(*set.texture(0).expect("page").get_pixel(3, 3), RED);
}

#[test]
fn greyscale_first_keeps_unclaimed_texels_grey() {
    let mut plane = Plane::standard();
    plane.fill_page(0, 1);
    let crm = plane.crm();
    let uses = [texture_use(0, CLUT_A, quad(0, 0, 16), true)];
    let options = TextureOptions {
        draw_greyscale_first: true,
        ..exact()
    };
    let set = build_textures(&crm, &uses, &options);
    let page = set.texture(0).expect("page");
    assert_eq!(*page.get_pixel(4, 4), RED);
    assert_eq!(*page.get_pixel(200, 200), Rgba([1, 1, 1, 255]));
}

#[test]
fn missing_page_is_skipped() {
    let mut plane = Plane::standard();
    plane.fill_page(0, 1);
    let crm = plane.crm();
    let uses = [
        texture_use(7, CLUT_B, quad(0, 0, 16), true),
        texture_use(0, CLUT_A, quad(0, 0, 16), true),
    ];
    let set = build_textures(&crm, &uses, &exact());
    assert_eq!(set.len(), 2);
    assert!(set.texture(7).is_none());
    assert_eq!(*set.texture(0).expect("page").get_pixel(100, 100), RED);
}

#[test]
fn clut_variants_are_built_once_per_pair() {
    let mut plane = Plane::standard();
    plane.fill_page(0, 1);
    let crm = plane.crm();
    let uses = [
        texture_use(0, CLUT_A, quad(0, 0, 16), true),
        texture_use(0, CLUT_A, quad(16, 16, 16), true),
        texture_use(0, CLUT_B, quad(64, 64, 16), true),
    ];
    let options = TextureOptions {
        use_each_unique_texture_clut_variation: true,
        ..exact()
    };
    let set = build_textures(&crm, &uses, &options);
    assert_eq!(set.variant_count(), 2);
    assert_eq!(set.variant_keys(), vec![(0, CLUT_A), (0, CLUT_B)]);
    assert!(set.has_variant(0, CLUT_B));

    let green = set.texture_with_clut(0, CLUT_B).expect("variant");
    assert_eq!(*green.get_pixel(0, 0), GREEN);
    assert!(std::ptr::eq(
        green,
        set.texture_with_clut(0, CLUT_B).expect("variant")
    ));

    let fallback = set.texture_with_clut(0, 0x1234).expect("fallback");
    assert!(std::ptr::eq(fallback, set.texture(0).expect("page")));
}

#[test]
fn rebuilding_gives_identical_pixels() {
    let mut plane = Plane::standard();
    plane.fill_page(0, 1);
    plane.fill_page(1, 1);
    plane.set_texel(0, 9, 9, 0);
    let crm = plane.crm();
    let uses = [
        texture_use(0, CLUT_A, quad(0, 0, 32), false),
        texture_use(0, CLUT_B, quad(8, 8, 32), true),
        texture_use(0, CLUT_A, quad(16, 16, 32), false),
        texture_use(0, CLUT_A | 1, quad(4, 20, 16), true),
        texture_use(1, CLUT_B, quad(0, 0, 16), true),
        texture_use(1, CLUT_A, quad(0, 0, 16), true),
    ];
    let options = TextureOptions {
        use_each_unique_texture_clut_variation: true,
        unhide_completely_transparent_textures: true,
        ..TextureOptions::default()
    };

    let first = build_textures(&crm, &uses, &options);
    let second = build_textures(&crm, &uses, &options);
    assert_eq!(first.textures(), second.textures());
    assert_eq!(first.variant_keys(), second.variant_keys());
    assert_eq!(first.variant_count(), 5);
    for (texture_id, clut) in first.variant_keys() {
        let a = first.texture_with_clut(texture_id, clut).expect("variant");
        let b = second.texture_with_clut(texture_id, clut).expect("variant");
        assert_eq!(a.as_raw(), b.as_raw(), "texture {texture_id} clut {clut:#06x}");
    }
}

#[test]
fn variants_are_off_by_default() {
    let crm = Plane::standard().crm();
    let uses = [texture_use(0, CLUT_A, quad(0, 0, 16), true)];
    let set = build_textures(&crm, &uses, &TextureOptions::default());
    assert_eq!(set.variant_count(), 0);
    assert!(!set.has_variant(0, CLUT_A));
}

#[test]
fn greyscale_build_covers_every_page() {
    let mut plane = Plane::standard();
    plane.set_texel(1, 5, 6, 200);
    let crm = plane.crm();
    let set = build_greyscale_textures(&crm);
    assert_eq!(set.len(), crm.page_count());
    assert_eq!(
        *set.texture(1).expect("page").get_pixel(5, 6),
        Rgba([200, 200, 200, 255])
    );
    assert_eq!(set.variant_count(), 0);
}

#[test]
fn texture_uses_follow_polygon_materials() {
    let model = Model {
        name: "test".to_string(),
        index: 0,
        platform: Platform::Psx,
        geometry: Geometry::default(),
        polygons: vec![
            Polygon {
                vertices: [0, 0, 0],
                material: 0,
                texels: [[0, 0]; 3],
                clut: 0,
            },
            Polygon {
                vertices: [0, 0, 0],
                material: 1,
                texels: quad(8, 8, 8),
                clut: CLUT_B,
            },
            Polygon {
                vertices: [0, 0, 0],
                material: 9,
                texels: [[0, 0]; 3],
                clut: 0,
            },
        ],
        materials: vec![
            Material::new(0, DEFAULT_COLOR, true),
            Material::new(3, 0x8040_2010, true),
        ],
        source: GeometrySource::Flat,
    };
    let uses = texture_uses(&model);
    assert_eq!(uses.len(), 2);
    assert!(!uses[0].texture_used);
    assert_eq!(uses[1].texture_id, 3);
    assert_eq!(uses[1].clut, CLUT_B);
    assert_eq!(uses[1].color, 0x8040_2010);
    assert_eq!(uses[1].texels, quad(8, 8, 8));
    assert!(uses[1].visible && uses[1].texture_used);
}

#[test]
fn options_deserialize_with_defaults() {
    let options: TextureOptions =
        serde::Deserialize::deserialize(serde::de::value::MapDeserializer::<
            _,
            serde::de::value::Error,
        >::new(
            [("draw_greyscale_first", true)].into_iter()
        ))
        .expect("options");
    assert!(options.draw_greyscale_first);
    assert!(options.quantize_bounds);
    assert!(!options.use_each_unique_texture_clut_variation);
}

#[test]
fn decode_all_corpus_textures() {
    let files = crm_test_files();
    if files.is_empty() {
        eprintln!("skipping decode_all_corpus_textures: no .crm files in testdata");
        return;
    }
    for path in files {
        let crm = match CrmFile::open_path(&path) {
            Ok(crm) => crm,
            Err(err) => panic!("failed to parse {}: {err}", path.display()),
        };
        let set = build_greyscale_textures(&crm);
        assert_eq!(set.len(), crm.page_count(), "{}", path.display());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn parse_crm_never_panics(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let _ = parse_crm(&data);
    }

    #[test]
    fn build_textures_never_panics(
        raw in proptest::collection::vec(
            (0u16..4, any::<u16>(), any::<[[u8; 2]; 3]>(), any::<bool>()),
            0..24,
        ),
        quantize in any::<bool>(),
        unhide in any::<bool>(),
    ) {
        let crm = Plane::standard().crm();
        let uses: Vec<_> = raw
            .into_iter()
            .map(|(texture_id, clut, texels, visible)| texture_use(texture_id, clut, texels, visible))
            .collect();
        let options = TextureOptions {
            quantize_bounds: quantize,
            unhide_completely_transparent_textures: unhide,
            use_each_unique_texture_clut_variation: true,
            ..TextureOptions::default()
        };
        let set = build_textures(&crm, &uses, &options);
        prop_assert_eq!(set.len(), crm.page_count());
    }
}
