use citygml::{CityModel, ParserConfig, TessellationMode, TessellationOptions, parse_str};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::io::Cursor;

/// Generate a CityGML document with `buildings` box-shaped buildings
///
/// Every building carries a roof, four walls as boundary surfaces, a few
/// thematic attributes and one generic attribute.
fn generate_citygml(buildings: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<core:CityModel xmlns:core="http://www.opengis.net/citygml/2.0"
    xmlns:bldg="http://www.opengis.net/citygml/building/2.0"
    xmlns:gen="http://www.opengis.net/citygml/generics/2.0"
    xmlns:gml="http://www.opengis.net/gml">
"#,
    );

    // Buildings on a grid, 20 m apart
    for i in 0..buildings {
        let x = (i % 100) as f64 * 20.0;
        let y = (i / 100) as f64 * 20.0;
        let (x1, y1, h) = (x + 10.0, y + 10.0, 12.0);

        xml.push_str(&format!(
            r#"  <core:cityObjectMember>
    <bldg:Building gml:id="B{i}">
      <bldg:function>1000</bldg:function>
      <bldg:measuredHeight uom="m">{h}</bldg:measuredHeight>
      <gen:stringAttribute name="district"><gen:value>North</gen:value></gen:stringAttribute>
      <bldg:lod2MultiSurface>
        <gml:MultiSurface>
          <gml:surfaceMember><gml:Polygon gml:id="B{i}_roof"><gml:exterior><gml:LinearRing>
            <gml:posList>{x} {y} {h} {x1} {y} {h} {x1} {y1} {h} {x} {y1} {h} {x} {y} {h}
            </gml:posList>
          </gml:LinearRing></gml:exterior></gml:Polygon></gml:surfaceMember>
        </gml:MultiSurface>
      </bldg:lod2MultiSurface>
"#
        ));

        let corners = [(x, y), (x1, y), (x1, y1), (x, y1), (x, y)];
        for (w, pair) in corners.windows(2).enumerate() {
            let ((ax, ay), (bx, by)) = (pair[0], pair[1]);
            xml.push_str(&format!(
                r#"      <bldg:boundedBy><bldg:WallSurface gml:id="B{i}_W{w}">
        <bldg:lod2MultiSurface><gml:MultiSurface>
        <gml:surfaceMember><gml:Polygon><gml:exterior><gml:LinearRing>
          <gml:posList>{ax} {ay} 0 {bx} {by} 0 {bx} {by} {h} {ax} {ay} {h} {ax} {ay} 0</gml:posList>
        </gml:LinearRing></gml:exterior></gml:Polygon></gml:surfaceMember>
      </gml:MultiSurface></bldg:lod2MultiSurface></bldg:WallSurface></bldg:boundedBy>
"#
            ));
        }

        xml.push_str("    </bldg:Building>\n  </core:cityObjectMember>\n");
    }

    xml.push_str("</core:CityModel>\n");
    xml
}

fn bench_parse_eager(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_eager");

    for &buildings in &[10, 100, 1000] {
        let xml = generate_citygml(buildings);

        group.bench_with_input(
            BenchmarkId::new("buildings", buildings),
            &xml,
            |b, xml| {
                b.iter(|| black_box(parse_str(xml, ParserConfig::default()).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_parse_deferred(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_deferred");
    group.sample_size(20);

    for &buildings in &[1000, 5000] {
        let xml = generate_citygml(buildings);
        let config = || ParserConfig::new().with_tessellation_mode(TessellationMode::Deferred);

        group.bench_with_input(
            BenchmarkId::new("buildings", buildings),
            &xml,
            |b, xml| {
                b.iter(|| black_box(parse_str(xml, config()).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_parse_without_tessellation(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_without_tessellation");

    for &buildings in &[100, 1000] {
        let xml = generate_citygml(buildings);
        let config = || ParserConfig::new().with_tessellation_mode(TessellationMode::Disabled);

        group.bench_with_input(
            BenchmarkId::new("buildings", buildings),
            &xml,
            |b, xml| {
                b.iter(|| {
                    let reader = Cursor::new(xml.as_bytes());
                    black_box(CityModel::from_reader_with_config(reader, config()).unwrap())
                });
            },
        );
    }

    group.finish();
}

fn bench_tessellate_all(c: &mut Criterion) {
    let xml = generate_citygml(1000);
    let config = ParserConfig::new().with_tessellation_mode(TessellationMode::Disabled);
    let model = parse_str(&xml, config).unwrap().model;

    c.bench_function("tessellate_all_1000_buildings", |b| {
        b.iter_batched(
            || model.clone(),
            |mut model| black_box(model.tessellate_all(TessellationOptions::default())),
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_parse_eager,
    bench_parse_deferred,
    bench_parse_without_tessellation,
    bench_tessellate_all
);
criterion_main!(benches);
