/*!

This is the long-form manual for `vote_metrics` and `votetime`.

## Dataset layout

The metrics are read from a directory of Parquet files, partitioned in the
hive style:

```text
VOTES_TIME_METRICS.parquet/
  turno=1/
    uf=ALL/zone_group=ALL/data_0.parquet
    uf=SP/zone_group=ALL/data_0.parquet
    uf=SP/zone_group=20-40/data_0.parquet
    ...
  turno=2/
    ...
```

The directory names hold `turno`, `uf` and `zone_group`. The files hold
`zone_code`, `section_code` and the measures:

* `total_votos` number of votes
* `total_secoes` number of sections
* `tempo_voto_medio` mean voting time, in seconds
* `tempo_biometria_medio` mean time spent on the biometric check, in seconds

Partition values are always read as strings: `zone_code=0007` stays `"0007"`.

### Aggregate rows

Every level carries precomputed aggregates tagged with `ALL`. For instance the
row `uf=SP, zone_group=ALL, zone_code=ALL, section_code=ALL` is the total for
the state of São Paulo, and `uf=ALL` rows are national totals.

## Filters

| filter    | values                                    | stored as                   |
|-----------|-------------------------------------------|-----------------------------|
| state     | one of the 28 codes (`ZZ` is abroad), ALL | `uf`                        |
| round     | 1, 2                                      | `turno`                     |
| zone      | 0 to 799, ALL                             | `zone_code`, `zone_group`   |
| section   | 0 to 799, ALL                             | `section_code`              |

Zones are grouped by buckets of 20: zone 37 is in `20-40`, zone 799 in `780-800`.

Selecting all the states matches every state code plus `ALL`, so that a single
query returns the per-state rows used by the map and the national row used for
the headline figures.

## Command line

```bash
votetime --config dash.json query --uf SP --turno 1 --zona 37
votetime query --params 'uf=RJ&turno=2'
votetime convert SP
```

`query` prints a JSON summary. With `--params`, unknown or invalid values fall
back to the defaults (`uf=ALL`, `turno=1`, `zona=ALL`, `secao=ALL`) the way
the dashboard does; explicit flags are validated strictly.

`convert` turns the CSV logs of one state into a single Parquet file, with a
`filename` column naming the log each row was read from.

*/
